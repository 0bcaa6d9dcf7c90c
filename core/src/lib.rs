//! PPU Replay Core - Scanline-batched memory replay
//!
//! This crate turns a scanline-addressable video memory model into an
//! ordered sequence of buffer copies and compute dispatches. It knows
//! nothing about the GPU: the presentation layer plugs in through
//! [`ScanlineBackend`] and [`StagingMemory`].
//!
//! # Architecture
//!
//! - [`MemoryUpdateComposer`] - Builds the staging blob and the static scanline schedule
//! - [`Mutator`] - Cadence-gated logic that rewrites one staging region
//! - [`FrameClock`] - Advances the frame counter and runs due mutators
//! - [`ScanlineScheduler`] - Interleaves copy application and compute batches
//! - [`cycler`] - In-place record rotation used by cycling mutators

pub mod clock;
pub mod composer;
pub mod cycler;
pub mod dump;
pub mod mutator;
pub mod nes;
pub mod scheduler;
pub mod staging;
#[cfg(test)]
pub mod test_utils;

pub use clock::{ClockConfig, ClockError, FrameClock, TickReport};
pub use composer::{
    ComposeError, ComposedUpdates, CopyMapping, DestinationBuffer, DestinationLayout,
    MemoryUpdate, MemoryUpdateComposer, RegionHandle, ScanlineSchedule,
};
pub use cycler::{BufferCycler, CycleError};
pub use dump::{DumpError, load_dump, load_frames};
pub use mutator::{FnMutator, MutateError, Mutator};
pub use scheduler::{
    FrameReport, FrameStep, ScanlineBackend, ScanlineBatch, ScanlineScheduler, ScheduleError,
    SubmitSync,
};
pub use staging::{HostStaging, StagingError, StagingMemory};
