//! Windowed player application
//!
//! One clock tick and one scanline replay per redraw. Escape quits and F11
//! toggles fullscreen. A frame whose replay fails ends the session.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use ppu_replay_core::FrameReport;

use crate::config::{self, Config};
use crate::graphics::PpuGraphics;
use crate::session::PpuSession;

/// Player actions bound to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    ToggleFullscreen,
}

pub fn key_action(key: KeyCode) -> Option<KeyAction> {
    match key {
        KeyCode::Escape => Some(KeyAction::Quit),
        KeyCode::F11 => Some(KeyAction::ToggleFullscreen),
        _ => None,
    }
}

pub struct App {
    config: Config,
    scene_name: String,
    session: PpuSession,
    window: Option<Arc<Window>>,
    graphics: Option<PpuGraphics>,
    next_frame: Instant,
    should_exit: bool,
    /// Error that ended the session
    fatal: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: Config, scene_name: &str, session: PpuSession) -> Self {
        Self {
            config,
            scene_name: scene_name.to_string(),
            session,
            window: None,
            graphics: None,
            next_frame: Instant::now(),
            should_exit: false,
            fatal: None,
        }
    }

    fn on_window_created(&mut self, window: Arc<Window>) -> Result<()> {
        if self.config.video.fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let graphics = PpuGraphics::new(
            window.clone(),
            self.config.video.vsync,
            self.config.video.scale_mode,
            self.session.frame_size(),
            self.session.destination_contents(),
            self.session.staging().as_bytes(),
        )?;

        self.graphics = Some(graphics);
        self.window = Some(window);
        Ok(())
    }

    fn render_frame(&mut self) {
        let Some(graphics) = &mut self.graphics else {
            return;
        };

        let result = self.session.render(graphics);
        self.finish_frame(result);
    }

    /// Record the outcome of one replayed frame. A failure is fatal.
    fn finish_frame(&mut self, result: Result<FrameReport>) {
        match result {
            Ok(report) => {
                tracing::trace!(
                    "Frame replayed: {} batches, {} update points",
                    report.batches,
                    report.update_points
                );
                self.next_frame = Instant::now() + self.session.clock_config().frame_period;
            }
            Err(e) => {
                tracing::error!("Stopping replay: {:#}", e);
                self.fatal = Some(e);
                self.should_exit = true;
            }
        }
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if let Some(graphics) = &mut self.graphics {
            graphics.resize(new_size.width, new_size.height);
        }
    }

    fn toggle_fullscreen(&mut self) {
        if let Some(window) = &self.window {
            let is_fullscreen = window.fullscreen().is_some();
            let new_fullscreen = if is_fullscreen {
                None
            } else {
                Some(Fullscreen::Borderless(None))
            };

            window.set_fullscreen(new_fullscreen);
            self.config.video.fullscreen = !is_fullscreen;

            if let Err(e) = config::save_fullscreen(!is_fullscreen) {
                tracing::warn!("Failed to save config: {}", e);
            }
        }
    }

    fn handle_key_input(&mut self, key_event: &KeyEvent) {
        if key_event.state != ElementState::Pressed || key_event.repeat {
            return;
        }
        let PhysicalKey::Code(key_code) = key_event.physical_key else {
            return;
        };

        match key_action(key_code) {
            Some(KeyAction::Quit) => self.should_exit = true,
            Some(KeyAction::ToggleFullscreen) => self.toggle_fullscreen(),
            None => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.session.frame_size();
        let scale = self.config.video.scale.max(1);
        let window_attributes = Window::default_attributes()
            .with_title(format!("PPU Replay - {}", self.scene_name))
            .with_inner_size(winit::dpi::LogicalSize::new(width * scale, height * scale));

        match event_loop.create_window(window_attributes) {
            Ok(window) => {
                if let Err(e) = self.on_window_created(Arc::new(window)) {
                    tracing::error!("Failed to initialize window: {:#}", e);
                    event_loop.exit();
                }
            }
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => self.handle_resize(new_size),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key_input(&event),
            WindowEvent::RedrawRequested => self.render_frame(),
            _ => {}
        }

        if self.should_exit {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Open the window and replay until it closes.
///
/// Returns the error that ended the session, if any.
pub fn run(mut app: App) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;
    use ppu_replay_core::nes::{Control, Oam, PpuMemory};
    use ppu_replay_core::{MemoryUpdate, ScanlineBackend, ScanlineBatch};

    use super::*;
    use crate::config::SessionConfig;
    use crate::scenes::Smb3Status;
    use crate::session::SessionMemory;

    /// Backend that accepts copies and optionally fails every dispatch
    struct StubBackend {
        fail_dispatch: bool,
    }

    impl ScanlineBackend for StubBackend {
        type Error = std::io::Error;

        fn apply_updates(&mut self, _: u32, _: &[MemoryUpdate]) -> Result<(), Self::Error> {
            Ok(())
        }

        fn dispatch_scanlines(&mut self, _: &ScanlineBatch) -> Result<(), Self::Error> {
            if self.fail_dispatch {
                Err(std::io::Error::other("device lost"))
            } else {
                Ok(())
            }
        }
    }

    fn status_app() -> App {
        let memory = SessionMemory {
            ppu_memory: Box::new(PpuMemory::zeroed()),
            oam: Oam::zeroed(),
            control: Control::default(),
        };
        let session =
            PpuSession::with_memory(&Smb3Status, &SessionConfig::default(), memory).unwrap();
        App::new(Config::default(), "smb3-status", session)
    }

    fn replay(app: &mut App, fail_dispatch: bool) {
        let result = app.session.run_frame(&mut StubBackend { fail_dispatch });
        app.finish_frame(result);
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_action(KeyCode::Escape), Some(KeyAction::Quit));
        assert_eq!(key_action(KeyCode::F11), Some(KeyAction::ToggleFullscreen));
        assert_eq!(key_action(KeyCode::Space), None);
    }

    #[test]
    fn test_successful_frame_keeps_running() {
        let mut app = status_app();
        replay(&mut app, false);
        assert!(!app.should_exit);
        assert!(app.fatal.is_none());
    }

    #[test]
    fn test_failed_dispatch_ends_session() {
        let mut app = status_app();
        replay(&mut app, true);
        assert!(app.should_exit);

        let error = app.fatal.take().unwrap();
        let message = format!("{error:#}");
        assert!(message.contains("failed to dispatch scanlines 0..192"), "{message}");
        assert!(message.contains("device lost"), "{message}");
    }
}
