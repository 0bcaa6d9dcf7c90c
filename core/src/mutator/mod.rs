//! Per-field mutators
//!
//! A mutator owns one staging region and rewrites its bytes whenever the
//! frame clock decides its cadence has elapsed. It never sees anything
//! outside its own region: the clock hands it a view of exactly those bytes.

mod cycle;
mod metasprite;
mod tileset;

pub use cycle::RecordCycler;
pub use metasprite::{
    AxisMotion, MetaspritePositionAnimator, MetaspriteSize, MetaspriteTileAnimator,
};
pub use tileset::TilesetFrameAnimator;

use crate::composer::RegionHandle;
use crate::cycler::CycleError;

/// Error raised by a mutator while rewriting its region
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutateError {
    #[error("region is {actual} bytes but the mutator expects {expected}")]
    RegionSize { expected: usize, actual: usize },

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error("frame {frame} has {available} bytes, need {needed}")]
    FrameTooShort {
        frame: usize,
        needed: usize,
        available: usize,
    },

    #[error("no frames to animate")]
    NoFrames,

    #[error("{0}")]
    Custom(String),
}

impl MutateError {
    /// Check that a view or region has the length a mutator was built for.
    pub fn check_len(expected: usize, actual: usize) -> Result<(), MutateError> {
        if expected == actual {
            Ok(())
        } else {
            Err(MutateError::RegionSize { expected, actual })
        }
    }
}

/// Cadence-gated logic that rewrites one staging region
pub trait Mutator {
    /// Region this mutator writes.
    fn region(&self) -> RegionHandle;

    /// Minimum number of frames between two invocations.
    fn cadence(&self) -> u64;

    /// Rewrite the region. `view` is exactly [`Mutator::region`]'s bytes.
    fn mutate(&mut self, view: &mut [u8]) -> Result<(), MutateError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Closure-backed mutator for one-off scene effects
pub struct FnMutator<F> {
    name: &'static str,
    region: RegionHandle,
    cadence: u64,
    f: F,
}

impl<F> FnMutator<F>
where
    F: FnMut(&mut [u8]) -> Result<(), MutateError>,
{
    pub fn new(name: &'static str, region: RegionHandle, cadence: u64, f: F) -> Self {
        Self {
            name,
            region,
            cadence,
            f,
        }
    }
}

impl<F> Mutator for FnMutator<F>
where
    F: FnMut(&mut [u8]) -> Result<(), MutateError>,
{
    fn region(&self) -> RegionHandle {
        self.region
    }

    fn cadence(&self) -> u64 {
        self.cadence
    }

    fn mutate(&mut self, view: &mut [u8]) -> Result<(), MutateError> {
        (self.f)(view)
    }

    fn name(&self) -> &str {
        self.name
    }
}
