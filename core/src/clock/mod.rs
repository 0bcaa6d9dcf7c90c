//! Fixed-cadence frame clock
//!
//! The clock is ticked once per presentation-loop iteration. It advances a
//! frame counter at most once per frame period (no catch-up after a stall)
//! and runs every mutator whose cadence has elapsed against its own staging
//! region.

mod config;

use std::time::Instant;

pub use config::ClockConfig;

use crate::mutator::Mutator;
use crate::staging::StagingMemory;

/// Error registering a mutator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("mutator `{name}` has a zero cadence")]
    ZeroCadence { name: String },
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Whether the frame counter advanced on this tick
    pub advanced: bool,
    /// Frame counter after the tick
    pub frame: u64,
    /// Mutators that ran successfully
    pub fired: usize,
    /// Mutators that were due but failed
    pub failed: usize,
}

struct ScheduledMutator {
    mutator: Box<dyn Mutator>,
    last_frame: u64,
}

impl ScheduledMutator {
    /// True when `cadence` frames have passed since the last run; records
    /// `current_frame` as the new last run.
    fn should_run(&mut self, current_frame: u64) -> bool {
        if current_frame.saturating_sub(self.last_frame) >= self.mutator.cadence() {
            self.last_frame = current_frame;
            true
        } else {
            false
        }
    }
}

/// Frame counter plus the mutators it drives
pub struct FrameClock {
    config: ClockConfig,
    current_frame: u64,
    last_advance: Option<Instant>,
    mutators: Vec<ScheduledMutator>,
}

impl FrameClock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            current_frame: 0,
            last_advance: None,
            mutators: Vec::new(),
        }
    }

    /// Register a mutator. It first becomes due `cadence` frames after frame 0.
    pub fn add_mutator(&mut self, mutator: Box<dyn Mutator>) -> Result<(), ClockError> {
        if mutator.cadence() == 0 {
            return Err(ClockError::ZeroCadence {
                name: mutator.name().to_string(),
            });
        }
        tracing::debug!(
            "Registered mutator `{}` every {} frames at staging {}..{}",
            mutator.name(),
            mutator.cadence(),
            mutator.region().staging_offset(),
            mutator.region().staging_offset() + mutator.region().size()
        );
        self.mutators.push(ScheduledMutator {
            mutator,
            last_frame: 0,
        });
        Ok(())
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn mutator_count(&self) -> usize {
        self.mutators.len()
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Tick against the current wall-clock time.
    pub fn tick(&mut self, staging: &mut impl StagingMemory) -> TickReport {
        self.tick_at(Instant::now(), staging)
    }

    /// Tick as if the current time were `now`.
    ///
    /// The first tick always advances, since there is no reference time yet.
    /// A failing mutator is logged and counted; the rest still run.
    pub fn tick_at(&mut self, now: Instant, staging: &mut impl StagingMemory) -> TickReport {
        let advanced = match self.last_advance {
            Some(last) => now.saturating_duration_since(last) >= self.config.frame_period,
            None => true,
        };
        if advanced {
            self.current_frame += 1;
            self.last_advance = Some(now);
            tracing::trace!("Frame clock advanced to {}", self.current_frame);
        }

        let mut report = TickReport {
            advanced,
            frame: self.current_frame,
            ..TickReport::default()
        };

        let pass_start = Instant::now();
        let current_frame = self.current_frame;
        for scheduled in &mut self.mutators {
            if !scheduled.should_run(current_frame) {
                continue;
            }

            let mutator = &mut scheduled.mutator;
            let region = mutator.region();
            let result = staging.map_range(region.staging_offset(), region.size(), |view| {
                mutator.mutate(view)
            });

            match result {
                Ok(Ok(())) => report.fired += 1,
                Ok(Err(e)) => {
                    tracing::error!(
                        "Mutator `{}` failed on frame {}: {}",
                        mutator.name(),
                        current_frame,
                        e
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Mutator `{}` could not map its region: {}", mutator.name(), e);
                    report.failed += 1;
                }
            }
        }

        let elapsed = pass_start.elapsed();
        if elapsed > self.config.mutator_budget {
            tracing::warn!(
                "Mutator pass took {:?}, over the {:?} budget",
                elapsed,
                self.config.mutator_budget
            );
        }

        report
    }
}
