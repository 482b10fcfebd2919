//! Convenience re-exports. `use coil::prelude::*` for the common items.

pub use crate::animation::{AnimationClip, SpriteAnimator, SpriteSheet};
pub use crate::app::{Context, Game};
pub use crate::camera::{Camera2D, CameraId, CameraManager};
pub use crate::collision::{Collider, ColliderShape, CollisionGroupRegistry};
pub use crate::config::EngineConfig;
pub use crate::error::EngineError;
pub use crate::input::{Input, KeyCode, MouseButton};
pub use crate::math::{Color, Mat4, Transform2D, UVec2, Vec2};
pub use crate::object::{Behavior, Entity, EntityId};
pub use crate::object_manager::ObjectManager;
pub use crate::render::{
    FontHandle, Material, MaterialHandle, Mesh, MeshHandle, Renderer, Shader, SpriteSheetHandle,
    TextureData, TextureHandle,
};
pub use crate::text::{HorizontalAlign, TextObject, VerticalAlign};
pub use crate::time::Time;
#[cfg(feature = "audio")]
pub use crate::audio::{AudioError, SoundControl, SoundInstanceId, SoundManager};
