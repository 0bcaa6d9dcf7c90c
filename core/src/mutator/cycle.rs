//! Record rotation mutator

use super::{MutateError, Mutator};
use crate::composer::RegionHandle;
use crate::cycler::{BufferCycler, check_stride};

/// Right-rotates its region by one `stride`-sized record per invocation.
pub struct RecordCycler {
    region: RegionHandle,
    cadence: u64,
    stride: usize,
}

impl RecordCycler {
    pub fn new(region: RegionHandle, cadence: u64, stride: usize) -> Result<Self, MutateError> {
        check_stride(region.size(), stride)?;
        Ok(Self {
            region,
            cadence,
            stride,
        })
    }
}

impl Mutator for RecordCycler {
    fn region(&self) -> RegionHandle {
        self.region
    }

    fn cadence(&self) -> u64 {
        self.cadence
    }

    fn mutate(&mut self, view: &mut [u8]) -> Result<(), MutateError> {
        BufferCycler::new(view).cycle_buffer(self.stride)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "record cycler"
    }
}
