//! Scanline batch scheduler
//!
//! Splits a frame's scanlines into compute batches around the static update
//! schedule. Every scheduled scanline gets its copies applied (and waited on)
//! before the batch starting at that scanline is dispatched, so each batch
//! observes exactly the updates that precede it.
//!
//! The plan is fixed once the schedule is known, so it is computed at
//! construction and replayed every frame.

mod backend;

use std::collections::BTreeMap;
use std::convert::Infallible;

pub use backend::{ScanlineBackend, ScanlineBatch, SubmitSync};

use crate::composer::{MemoryUpdate, ScanlineSchedule};

/// Scheduler errors. The default type parameter covers setup, which never
/// touches a backend.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError<E = Infallible> {
    #[error("frame has zero scanlines")]
    EmptyFrame,

    #[error("update scheduled at scanline {scanline} is outside the {total}-scanline frame")]
    ScanlineOutOfRange { scanline: u32, total: u32 },

    #[error("failed to apply updates at scanline {scanline}")]
    Apply {
        scanline: u32,
        #[source]
        source: E,
    },

    #[error("failed to dispatch scanlines {first}..{}", .first + .count)]
    Dispatch {
        first: u32,
        count: u32,
        #[source]
        source: E,
    },
}

/// One step of a frame's plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    /// Apply every copy registered for this scanline
    ApplyUpdates { scanline: u32 },
    /// Dispatch one compute batch
    Dispatch(ScanlineBatch),
}

/// Summary of a completed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub batches: u32,
    pub scanlines: u32,
    /// Scanline entries whose copies were applied
    pub update_points: u32,
}

/// Replays the per-frame batch plan against a backend
#[derive(Debug, Clone)]
pub struct ScanlineScheduler {
    total_scanlines: u32,
    updates: BTreeMap<u32, Vec<MemoryUpdate>>,
    plan: Vec<FrameStep>,
}

impl ScanlineScheduler {
    /// Build a scheduler from a scanline-keyed update map.
    ///
    /// Every key must be below `total_scanlines`.
    pub fn new(
        total_scanlines: u32,
        updates: BTreeMap<u32, Vec<MemoryUpdate>>,
    ) -> Result<Self, ScheduleError> {
        if total_scanlines == 0 {
            return Err(ScheduleError::EmptyFrame);
        }
        if let Some((&scanline, _)) = updates.last_key_value()
            && scanline >= total_scanlines
        {
            return Err(ScheduleError::ScanlineOutOfRange {
                scanline,
                total: total_scanlines,
            });
        }

        let plan = plan_frame(total_scanlines, &updates);

        tracing::debug!(
            "Scanline plan: {} batches, {} update points over {} scanlines",
            plan.iter().filter(|step| is_dispatch(step)).count(),
            updates.len(),
            total_scanlines
        );

        Ok(Self {
            total_scanlines,
            updates,
            plan,
        })
    }

    /// Build a scheduler from the composer's per-destination schedule.
    pub fn from_schedule(
        total_scanlines: u32,
        schedule: &ScanlineSchedule,
    ) -> Result<Self, ScheduleError> {
        Self::new(total_scanlines, schedule.merged())
    }

    pub fn total_scanlines(&self) -> u32 {
        self.total_scanlines
    }

    /// The steps replayed every frame, in submission order.
    pub fn plan(&self) -> &[FrameStep] {
        &self.plan
    }

    /// Batches dispatched every frame, in submission order.
    pub fn batches(&self) -> impl Iterator<Item = &ScanlineBatch> {
        self.plan.iter().filter_map(|step| match step {
            FrameStep::Dispatch(batch) => Some(batch),
            FrameStep::ApplyUpdates { .. } => None,
        })
    }

    /// Run one frame. The first backend failure aborts the frame.
    pub fn run_frame<B: ScanlineBackend>(
        &self,
        backend: &mut B,
    ) -> Result<FrameReport, ScheduleError<B::Error>> {
        let mut report = FrameReport::default();

        for step in &self.plan {
            match *step {
                FrameStep::ApplyUpdates { scanline } => {
                    let updates = self
                        .updates
                        .get(&scanline)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    backend
                        .apply_updates(scanline, updates)
                        .map_err(|source| ScheduleError::Apply { scanline, source })?;
                    report.update_points += 1;
                }
                FrameStep::Dispatch(batch) => {
                    backend
                        .dispatch_scanlines(&batch)
                        .map_err(|source| ScheduleError::Dispatch {
                            first: batch.first_scanline,
                            count: batch.scanline_count,
                            source,
                        })?;
                    report.batches += 1;
                    report.scanlines += batch.scanline_count;
                }
            }
        }

        assert_eq!(
            report.scanlines, self.total_scanlines,
            "frame dispatched {} of {} scanlines",
            report.scanlines, self.total_scanlines
        );
        Ok(report)
    }
}

/// Interleave copy application and dispatches for one frame.
///
/// Keys must be unique (map keys) and below `total`.
fn plan_frame(total: u32, updates: &BTreeMap<u32, Vec<MemoryUpdate>>) -> Vec<FrameStep> {
    let keys: Vec<u32> = updates.keys().copied().collect();
    let mut plan = Vec::with_capacity(keys.len() * 2 + 1);
    let mut rendered = 0;

    // Pre-update batch up to the first scheduled scanline
    if let Some(&first) = keys.first()
        && first > 0
    {
        push_batch(&mut plan, 0, first);
        rendered = first;
    }

    for (i, &scanline) in keys.iter().enumerate() {
        debug_assert_eq!(rendered, scanline);
        plan.push(FrameStep::ApplyUpdates { scanline });
        let next = keys.get(i + 1).copied().unwrap_or(total);
        push_batch(&mut plan, scanline, next);
        rendered = next;
    }

    if rendered < total {
        push_batch(&mut plan, rendered, total);
    }

    // First submission waits on external prerequisites, only the last signals
    if let Some(FrameStep::Dispatch(first)) = plan.iter_mut().find(|step| is_dispatch(step)) {
        first.sync.wait_external = true;
    }
    if let Some(FrameStep::Dispatch(last)) = plan.iter_mut().rev().find(|step| is_dispatch(step)) {
        last.sync.signal_complete = true;
    }

    plan
}

fn push_batch(plan: &mut Vec<FrameStep>, first: u32, end: u32) {
    plan.push(FrameStep::Dispatch(ScanlineBatch {
        first_scanline: first,
        scanline_count: end - first,
        sync: SubmitSync::default(),
    }));
}

fn is_dispatch(step: &FrameStep) -> bool {
    matches!(step, FrameStep::Dispatch(_))
}
