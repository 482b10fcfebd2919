//! Named render layers. Lower ordinals draw first.

use std::collections::HashMap;

use crate::error::EngineError;

/// Number of render layer slots.
pub const MAX_LAYERS: usize = 16;

/// Fixed-capacity, bidirectional name ↔ ordinal table.
#[derive(Debug, Clone)]
pub struct RenderLayerRegistry {
    names: [Option<String>; MAX_LAYERS],
    ordinals: HashMap<String, u8>,
}

impl RenderLayerRegistry {
    pub fn new() -> Self {
        Self {
            names: std::array::from_fn(|_| None),
            ordinals: HashMap::new(),
        }
    }

    /// Assign `tag` to `ordinal`. Fails without changing anything if the tag
    /// exists, the ordinal is out of range, or the ordinal is taken.
    pub fn register(&mut self, tag: &str, ordinal: usize) -> Result<u8, EngineError> {
        if self.ordinals.contains_key(tag) {
            log::warn!("Render layer '{tag}' already exists");
            return Err(EngineError::DuplicateTag {
                kind: "render layer",
                tag: tag.to_owned(),
            });
        }
        if ordinal >= MAX_LAYERS {
            log::error!("Render layer ordinal {ordinal} is out of range (0..{MAX_LAYERS})");
            return Err(EngineError::LayerOutOfRange(ordinal));
        }
        if let Some(owner) = &self.names[ordinal] {
            log::error!("Render layer ordinal {ordinal} is already used by '{owner}'");
            return Err(EngineError::LayerTaken {
                ordinal,
                owner: owner.clone(),
            });
        }
        self.names[ordinal] = Some(tag.to_owned());
        self.ordinals.insert(tag.to_owned(), ordinal as u8);
        Ok(ordinal as u8)
    }

    /// Assign `tag` to the lowest free ordinal.
    pub fn register_next(&mut self, tag: &str) -> Result<u8, EngineError> {
        match self.names.iter().position(Option::is_none) {
            Some(ordinal) => self.register(tag, ordinal),
            None if self.ordinals.contains_key(tag) => self.register(tag, 0),
            None => {
                log::error!("Cannot register render layer '{tag}': all {MAX_LAYERS} slots in use");
                Err(EngineError::LayerCapacity)
            }
        }
    }

    pub fn ordinal(&self, tag: &str) -> Option<u8> {
        self.ordinals.get(tag).copied()
    }

    pub fn name(&self, ordinal: usize) -> Option<&str> {
        self.names.get(ordinal)?.as_deref()
    }

    /// Free the slot held by `tag`. Returns `false` if the tag is unknown.
    pub fn unregister(&mut self, tag: &str) -> bool {
        match self.ordinals.remove(tag) {
            Some(ordinal) => {
                self.names[ordinal as usize] = None;
                true
            }
            None => {
                log::info!("Cannot unregister unknown render layer '{tag}'");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }
}

impl Default for RenderLayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup_both_ways() {
        let mut layers = RenderLayerRegistry::new();
        assert_eq!(layers.register("background", 0), Ok(0));
        assert_eq!(layers.register("ui", 15), Ok(15));
        assert_eq!(layers.ordinal("ui"), Some(15));
        assert_eq!(layers.name(0), Some("background"));
        assert_eq!(layers.name(3), None);
        assert_eq!(layers.name(99), None);
    }

    #[test]
    fn duplicate_name_taken_slot_and_out_of_range_fail() {
        let mut layers = RenderLayerRegistry::new();
        layers.register("a", 1).unwrap();
        assert!(matches!(layers.register("a", 2), Err(EngineError::DuplicateTag { .. })));
        assert!(matches!(layers.register("b", 1), Err(EngineError::LayerTaken { .. })));
        assert_eq!(layers.register("c", 16), Err(EngineError::LayerOutOfRange(16)));
        assert_eq!(layers.len(), 1);
        assert_eq!(layers.ordinal("a"), Some(1));
    }

    #[test]
    fn seventeenth_layer_fails_without_mutation() {
        let mut layers = RenderLayerRegistry::new();
        for i in 0..MAX_LAYERS {
            layers.register_next(&format!("layer{i}")).unwrap();
        }
        let before: Vec<_> = (0..MAX_LAYERS).map(|i| layers.name(i).map(str::to_owned)).collect();

        assert_eq!(layers.register_next("extra"), Err(EngineError::LayerCapacity));
        for ordinal in 0..MAX_LAYERS {
            assert!(layers.register("extra", ordinal).is_err());
        }
        assert!(layers.register("extra", MAX_LAYERS).is_err());

        let after: Vec<_> = (0..MAX_LAYERS).map(|i| layers.name(i).map(str::to_owned)).collect();
        assert_eq!(before, after);
        assert_eq!(layers.ordinal("extra"), None);
        assert_eq!(layers.len(), MAX_LAYERS);
    }

    #[test]
    fn unregister_frees_the_slot() {
        let mut layers = RenderLayerRegistry::new();
        layers.register("fx", 4).unwrap();
        assert!(layers.unregister("fx"));
        assert!(!layers.unregister("fx"));
        assert_eq!(layers.register("other", 4), Ok(4));
    }
}
