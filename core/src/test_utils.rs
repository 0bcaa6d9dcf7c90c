//! Shared test helpers

use crate::composer::{
    ComposedUpdates, CopyMapping, DestinationBuffer, MemoryUpdate, MemoryUpdateComposer,
};
use crate::nes::{Control, PpuMemory};
use crate::scheduler::{ScanlineBackend, ScanlineBatch};

/// Something the recording backend was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Apply {
        scanline: u32,
        copies: Vec<(DestinationBuffer, CopyMapping)>,
    },
    Dispatch(ScanlineBatch),
}

#[derive(Debug, thiserror::Error)]
#[error("simulated submission failure")]
pub struct SimulatedFailure;

/// Backend that records calls instead of talking to a GPU
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub events: Vec<BackendEvent>,
    /// Fail the dispatch whose batch starts at this scanline
    pub fail_dispatch_at: Option<u32>,
    /// Fail the copy application for this scanline
    pub fail_apply_at: Option<u32>,
}

impl RecordingBackend {
    pub fn dispatches(&self) -> Vec<ScanlineBatch> {
        self.events
            .iter()
            .filter_map(|event| match event {
                BackendEvent::Dispatch(batch) => Some(*batch),
                BackendEvent::Apply { .. } => None,
            })
            .collect()
    }

    pub fn batch_sizes(&self) -> Vec<u32> {
        self.dispatches()
            .iter()
            .map(|batch| batch.scanline_count)
            .collect()
    }
}

impl ScanlineBackend for RecordingBackend {
    type Error = SimulatedFailure;

    fn apply_updates(
        &mut self,
        scanline: u32,
        updates: &[MemoryUpdate],
    ) -> Result<(), Self::Error> {
        if self.fail_apply_at == Some(scanline) {
            return Err(SimulatedFailure);
        }
        let copies = updates
            .iter()
            .flat_map(|update| {
                update
                    .regions
                    .iter()
                    .map(move |mapping| (update.destination, *mapping))
            })
            .collect();
        self.events.push(BackendEvent::Apply { scanline, copies });
        Ok(())
    }

    fn dispatch_scanlines(&mut self, batch: &ScanlineBatch) -> Result<(), Self::Error> {
        if self.fail_dispatch_at == Some(batch.first_scanline) {
            return Err(SimulatedFailure);
        }
        self.events.push(BackendEvent::Dispatch(*batch));
        Ok(())
    }
}

/// A 4-byte palette field updated at scanline 0 and a 1-byte nametable
/// switch at scanline 192.
pub fn palette_and_status_bar() -> ComposedUpdates {
    let mut composer = MemoryUpdateComposer::nes();
    let palette = composer
        .add_staging_field(
            DestinationBuffer::PpuMemory,
            PpuMemory::background_palette_offset(3, 0),
            4,
            Some(&[0x0F, 0x30, 0x17, 0x0F]),
        )
        .unwrap();
    let nametable = composer
        .add_staging_field(
            DestinationBuffer::Control,
            Control::NAMETABLE_START,
            1,
            Some(&[2]),
        )
        .unwrap();
    composer.add_update(palette, 0).unwrap();
    composer.add_update(nametable, 192).unwrap();
    composer.build()
}
