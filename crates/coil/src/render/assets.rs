//! # Assets — Tag-keyed Registries
//!
//! Every render resource is stored in a slot vector and named by a string tag.
//! Callers hold small `Copy` handles (an index into the slots), never the
//! resource itself.
//!
//! ```text
//! Registry<Material>
//! ┌───────────────────────────────────────────────┐
//! │ slots: Vec<Option<Material>>                  │
//! │   [0] Some(default)  ◄── built in             │
//! │   [1] Some("player")                          │
//! │   [2] None            ◄── unregistered        │
//! │                                               │
//! │ tags: HashMap<String, usize>                  │
//! │   "coil/default" → 0                          │
//! │   "player"       → 1                          │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Removing a resource empties its slot rather than shifting the vector, so
//! stale handles resolve to `None` instead of to some other resource. Handle
//! equality is identity: two materials with identical contents registered
//! under different tags are different materials.

use std::collections::HashMap;

use crate::animation::SpriteSheet;
use crate::error::EngineError;
use crate::text::Font;

use super::material::{Material, Shader};
use super::mesh::Mesh;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);
    };
}

handle!(
    /// Handle to a registered [`Shader`].
    ShaderHandle
);
handle!(
    /// Handle to a texture uploaded through the backend.
    TextureHandle
);
handle!(
    /// Handle to a registered [`Mesh`].
    MeshHandle
);
handle!(
    /// Handle to a registered [`Material`].
    MaterialHandle
);
handle!(
    /// Handle to a registered [`SpriteSheet`].
    SpriteSheetHandle
);
handle!(
    /// Handle to a registered [`Font`].
    FontHandle
);

/// Size of an uploaded texture. Pixels live on the GPU only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
}

/// Slot storage with an optional tag per slot.
#[derive(Debug)]
pub(crate) struct Registry<T> {
    kind: &'static str,
    slots: Vec<Option<T>>,
    tags: HashMap<String, usize>,
}

impl<T> Registry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            tags: HashMap::new(),
        }
    }

    /// Store `item`. A tag that is already taken is rejected and logged.
    pub fn insert(&mut self, tag: Option<&str>, item: T) -> Result<usize, EngineError> {
        if let Some(tag) = tag {
            if self.tags.contains_key(tag) {
                log::warn!("{} '{}' is already registered", self.kind, tag);
                return Err(EngineError::DuplicateTag {
                    kind: self.kind,
                    tag: tag.to_owned(),
                });
            }
        }
        let index = self.slots.len();
        self.slots.push(Some(item));
        if let Some(tag) = tag {
            self.tags.insert(tag.to_owned(), index);
        }
        Ok(index)
    }

    /// Index the next `insert` will use.
    pub fn next_index(&self) -> usize {
        self.slots.len()
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.tags.get(tag).copied()
    }

    pub fn tag_of(&self, index: usize) -> Option<&str> {
        self.tags
            .iter()
            .find(|&(_, &i)| i == index)
            .map(|(tag, _)| tag.as_str())
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Overwrite a live slot. Returns `false` if the slot is empty.
    pub fn replace(&mut self, index: usize, item: T) -> bool {
        match self.slots.get_mut(index) {
            Some(slot @ Some(_)) => {
                *slot = Some(item);
                true
            }
            _ => false,
        }
    }

    /// Empty the slot and drop its tag.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.slots.get_mut(index)?.take();
        self.tags.retain(|_, &mut i| i != index);
        item
    }

    pub fn unknown(&self, tag: &str) -> EngineError {
        EngineError::UnknownTag {
            kind: self.kind,
            tag: tag.to_owned(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (i, item)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|item| (i, item)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// All render resources owned by the renderer.
#[derive(Debug)]
pub struct RenderAssets {
    pub(crate) shaders: Registry<Shader>,
    pub(crate) textures: Registry<TextureInfo>,
    pub(crate) meshes: Registry<Mesh>,
    pub(crate) materials: Registry<Material>,
    pub(crate) sprite_sheets: Registry<SpriteSheet>,
    pub(crate) fonts: Registry<Font>,
}

impl RenderAssets {
    pub(crate) fn new() -> Self {
        Self {
            shaders: Registry::new("shader"),
            textures: Registry::new("texture"),
            meshes: Registry::new("mesh"),
            materials: Registry::new("material"),
            sprite_sheets: Registry::new("sprite sheet"),
            fonts: Registry::new("font"),
        }
    }

    pub fn shader(&self, handle: ShaderHandle) -> Option<&Shader> {
        self.shaders.get(handle.0)
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&TextureInfo> {
        self.textures.get(handle.0)
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle.0)
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle.0)
    }

    pub fn sprite_sheet(&self, handle: SpriteSheetHandle) -> Option<&SpriteSheet> {
        self.sprite_sheets.get(handle.0)
    }

    pub fn font(&self, handle: FontHandle) -> Option<&Font> {
        self.fonts.get(handle.0)
    }

    /// Shader of a material, if both are still registered.
    pub fn material_shader(&self, handle: MaterialHandle) -> Option<(ShaderHandle, &Shader)> {
        let material = self.material(handle)?;
        self.shader(material.shader).map(|s| (material.shader, s))
    }

    /// A material draws instanced only if it asks for it and its shader has
    /// per-instance inputs.
    pub fn can_instance(&self, handle: MaterialHandle) -> bool {
        match self.material(handle) {
            Some(material) => {
                material.wants_instancing()
                    && self
                        .shader(material.shader)
                        .is_some_and(Shader::supports_instancing)
            }
            None => false,
        }
    }

    pub(crate) fn shader_in_use(&self, handle: ShaderHandle) -> bool {
        self.materials.iter().any(|(_, m)| m.shader == handle)
    }

    pub(crate) fn texture_in_use(&self, handle: TextureHandle) -> bool {
        self.materials.iter().any(|(_, m)| m.texture == Some(handle))
            || self.sprite_sheets.iter().any(|(_, s)| s.texture == handle)
            || self.fonts.iter().any(|(_, f)| f.texture() == handle)
    }

    pub(crate) fn material_in_use(&self, handle: MaterialHandle) -> bool {
        self.fonts.iter().any(|(_, f)| f.material() == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tags_are_rejected() {
        let mut reg: Registry<u32> = Registry::new("thing");
        assert_eq!(reg.insert(Some("a"), 1), Ok(0));
        assert!(matches!(
            reg.insert(Some("a"), 2),
            Err(EngineError::DuplicateTag { .. })
        ));
        assert_eq!(reg.get(0), Some(&1));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn removed_slots_stay_empty() {
        let mut reg: Registry<&str> = Registry::new("thing");
        let a = reg.insert(Some("a"), "first").unwrap();
        let b = reg.insert(None, "second").unwrap();
        assert_eq!(reg.remove(a), Some("first"));
        assert_eq!(reg.get(a), None);
        assert_eq!(reg.index_of("a"), None);
        assert_eq!(reg.get(b), Some(&"second"));
        // a new tag never reuses the emptied slot
        let c = reg.insert(Some("a"), "third").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn replace_only_touches_live_slots() {
        let mut reg: Registry<u8> = Registry::new("thing");
        let i = reg.insert(None, 1).unwrap();
        assert!(reg.replace(i, 9));
        assert_eq!(reg.get(i), Some(&9));
        reg.remove(i);
        assert!(!reg.replace(i, 3));
    }
}
