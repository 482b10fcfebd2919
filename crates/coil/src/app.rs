//! Game entry point.
//!
//! Implement [`Game`] and hand it to [`run`]:
//!
//! ```ignore
//! use coil::prelude::*;
//!
//! struct Demo;
//!
//! impl Game for Demo {
//!     fn init(&mut self, ctx: &mut Context) -> Result<(), EngineError> {
//!         let quad = ctx.renderer.defaults().quad;
//!         let material = ctx.renderer.defaults().color_material;
//!         ctx.objects.add_object(Entity::new().with_mesh(quad).with_material(material));
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), EngineError> {
//!     coil::init_logging();
//!     coil::run(EngineConfig::default().title("demo"), Demo)
//! }
//! ```
//!
//! Each frame runs, in order: `Game::update`, object updates, the collision
//! pass, `Game::draw`, the draw flush, the debug-line flush, present.

use crate::camera::CameraManager;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::Input;
use crate::object_manager::ObjectManager;
use crate::render::renderer::Renderer;
use crate::render::wgpu_backend::WgpuBackend;
use crate::time::Time;

/// Everything a game can reach during a frame.
pub struct Context {
    pub config: EngineConfig,
    pub renderer: Renderer<WgpuBackend>,
    pub objects: ObjectManager,
    pub cameras: CameraManager,
    pub input: Input,
    pub time: Time,
    #[cfg(feature = "audio")]
    pub audio: Option<crate::audio::SoundManager>,
}

impl Context {
    pub(crate) fn new(config: EngineConfig, backend: WgpuBackend) -> Result<Self, EngineError> {
        let renderer = Renderer::new(backend, &config)?;
        Ok(Self {
            objects: ObjectManager::new(&config),
            cameras: CameraManager::new(config.width, config.height),
            input: Input::new(),
            time: Time::new(),
            #[cfg(feature = "audio")]
            audio: crate::audio::SoundManager::new()
                .inspect_err(|e| log::error!("Audio disabled: {e}"))
                .ok(),
            renderer,
            config,
        })
    }

    /// Submit every object through the active camera.
    pub fn draw_objects(&mut self) {
        self.objects
            .draw_all(&mut self.renderer, self.cameras.active());
    }
}

/// Game hooks called by the runner. Only `init` is required; the default
/// `draw` submits every object through the active camera.
pub trait Game {
    fn init(&mut self, ctx: &mut Context) -> Result<(), EngineError>;

    fn update(&mut self, _ctx: &mut Context, _dt: f32) {}

    fn draw(&mut self, ctx: &mut Context) {
        ctx.draw_objects();
    }

    /// Called once before the window closes.
    fn shutdown(&mut self, _ctx: &mut Context) {}
}

/// Open the window and drive `game` until it closes.
pub fn run(config: EngineConfig, game: impl Game + 'static) -> Result<(), EngineError> {
    let event_loop = winit::event_loop::EventLoop::new()
        .map_err(|e| EngineError::Gpu(format!("event loop: {e}")))?;
    let mut app = crate::window::WinitApp::new(config, Box::new(game));
    event_loop
        .run_app(&mut app)
        .map_err(|e| EngineError::Gpu(format!("event loop: {e}")))?;
    app.into_result()
}
