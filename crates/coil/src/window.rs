//! Window management via winit.
//!
//! Implements [`winit::application::ApplicationHandler`]: creates the window
//! and GPU context on the first `resumed`, forwards input, handles resize,
//! and runs one frame per `RedrawRequested`.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::app::{Context, Game};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::math::Vec2;
use crate::render::gpu::GpuContext;
use crate::render::wgpu_backend::WgpuBackend;

pub(crate) struct WinitApp {
    config: Option<EngineConfig>,
    game: Box<dyn Game>,
    ctx: Option<Context>,
    window: Option<Arc<Window>>,
    error: Option<EngineError>,
}

impl WinitApp {
    pub fn new(config: EngineConfig, game: Box<dyn Game>) -> Self {
        Self {
            config: Some(config),
            game,
            ctx: None,
            window: None,
            error: None,
        }
    }

    /// The error that stopped the loop, if any.
    pub fn into_result(self) -> Result<(), EngineError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), EngineError> {
        let Some(config) = self.config.take() else {
            return Ok(());
        };
        let attrs = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| EngineError::Gpu(format!("window creation failed: {e}")))?,
        );

        let gpu = GpuContext::new(window.clone(), config.vsync)?;
        let mut ctx = Context::new(config, WgpuBackend::new(gpu))?;
        self.game.init(&mut ctx)?;
        ctx.objects.init_all();

        window.request_redraw();
        self.window = Some(window);
        self.ctx = Some(ctx);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: EngineError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for WinitApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.start(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(ctx) = &mut self.ctx else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Window close requested, exiting.");
                self.game.shutdown(ctx);
                ctx.objects.free_all();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                ctx.renderer.backend_mut().resize(size.width, size.height);
                if size.width > 0 && size.height > 0 {
                    ctx.cameras.set_screen_size_all(size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => ctx.input.keys.press(key),
                        ElementState::Released => ctx.input.keys.release(key),
                    }
                }
            }

            WindowEvent::MouseInput { button, state, .. } => match state {
                ElementState::Pressed => ctx.input.mouse.press(button),
                ElementState::Released => ctx.input.mouse.release(button),
            },

            WindowEvent::CursorMoved { position, .. } => {
                ctx.input
                    .set_cursor(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::RedrawRequested => {
                ctx.time.tick();
                let dt = ctx.time.delta_secs();

                self.game.update(ctx, dt);
                ctx.objects.update_all(dt, &ctx.cameras);
                ctx.objects.check_collisions();

                self.game.draw(ctx);
                ctx.renderer.flush_draw_commands();
                ctx.renderer.flush_debug_line_draw_commands();

                let clear = ctx.config.clear_color;
                match ctx.renderer.backend_mut().present(clear) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let backend = ctx.renderer.backend_mut();
                        let (w, h) = backend.gpu().surface_size();
                        backend.resize(w, h);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory!");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("Surface error: {e:?}"),
                }

                #[cfg(feature = "audio")]
                if let Some(audio) = &mut ctx.audio {
                    audio.collect_finished();
                }

                ctx.input.end_frame();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}
