//! # Coil — 2D Engine Core
//!
//! Entities, collision and batched rendering for small 2D games, on wgpu and
//! winit.
//!
//! - [`object_manager`]: entity lifecycle, the per-frame collision pass and
//!   draw submission.
//! - [`collision`]: spatial hash broad phase, group bitmasks, circle/box
//!   narrow phase.
//! - [`render`]: tag-keyed resource registries, 16 render layers, batching
//!   into instanced draws, culling, debug lines.
//! - [`text`]: glyph atlas that grows on demand, text layout, cached text
//!   meshes.
//!
//! Start with `use coil::prelude::*` and implement [`Game`](app::Game).

pub mod animation;
pub mod app;
pub mod camera;
pub mod collision;
pub mod config;
pub mod error;
pub mod input;
pub mod math;
pub mod object;
pub mod object_manager;
pub mod prelude;
pub mod render;
pub mod text;
pub mod time;
pub(crate) mod window;

#[cfg(feature = "audio")]
pub mod audio;

pub use app::run;

/// Install `env_logger` with `info` as the default level. `RUST_LOG`
/// overrides it. Calling this more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
