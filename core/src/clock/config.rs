//! Frame clock configuration

use std::time::Duration;

/// Frame clock configuration
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Real time between two frame advances
    pub frame_period: Duration,
    /// Mutator pass duration above which a warning is logged
    pub mutator_budget: Duration,
}

impl ClockConfig {
    pub const DEFAULT_FRAME_PERIOD_MICROS: u64 = 16_666;

    pub fn from_micros(frame_period_micros: u64) -> Self {
        Self {
            frame_period: Duration::from_micros(frame_period_micros),
            ..Self::default()
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frame_period: Duration::from_micros(Self::DEFAULT_FRAME_PERIOD_MICROS),
            mutator_budget: Duration::from_micros(4000), // 4ms at 60fps
        }
    }
}
