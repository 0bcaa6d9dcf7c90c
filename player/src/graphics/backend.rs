//! Scheduler backend implementation

use ppu_replay_core::{MemoryUpdate, ScanlineBackend, ScanlineBatch};

use super::{GpuError, PpuGraphics};

impl ScanlineBackend for PpuGraphics {
    type Error = GpuError;

    /// Apply one scanline entry and wait for it, so the next batch reads
    /// the updated destinations.
    fn apply_updates(&mut self, scanline: u32, updates: &[MemoryUpdate]) -> Result<(), GpuError> {
        let device = &self.context.device;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scanline Update Encoder"),
        });
        self.copy_pass.encode(
            device,
            &self.context.queue,
            &mut encoder,
            &self.staging,
            &self.destinations,
            updates,
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
        device.poll(wgpu::PollType::wait_indefinitely())?;

        tracing::trace!(
            "Applied {} destination updates at scanline {}",
            updates.len(),
            scanline
        );
        Ok(())
    }

    fn dispatch_scanlines(&mut self, batch: &ScanlineBatch) -> Result<(), GpuError> {
        if batch.sync.wait_external {
            self.frame_complete = None;
            self.acquire_surface();
        }

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Scanline Batch Encoder"),
                });
        self.ppu_pass
            .encode(&mut encoder, batch, self.frame.width);
        let index = self.context.queue.submit(std::iter::once(encoder.finish()));

        if batch.sync.signal_complete {
            self.frame_complete = Some(index);
        }

        tracing::trace!(
            "Dispatched scanlines {}..{}",
            batch.first_scanline,
            batch.end_scanline()
        );
        Ok(())
    }
}
