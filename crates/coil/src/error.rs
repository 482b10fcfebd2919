//! Engine-wide error type.
//!
//! Registration and loading APIs return `Result<_, EngineError>` and also log
//! the failure, so callers that ignore the result still leave a trace. Nothing
//! on the per-frame path returns an error; it falls back to defaults instead.

use std::fmt;

/// Errors reported by registries, loaders and the GPU backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A resource with this tag is already registered.
    DuplicateTag { kind: &'static str, tag: String },
    /// No resource with this tag is registered.
    UnknownTag { kind: &'static str, tag: String },
    /// Render layer ordinal outside `0..MAX_LAYERS`.
    LayerOutOfRange(usize),
    /// Render layer ordinal already assigned to another tag.
    LayerTaken { ordinal: usize, owner: String },
    /// All render layer slots are assigned.
    LayerCapacity,
    /// Font pixel size outside the supported range.
    FontSize(u32),
    /// Failed to read or decode an asset file.
    AssetLoad { path: String, reason: String },
    /// Shader creation failed.
    Shader(String),
    /// The resource is still referenced and cannot be removed.
    InUse { kind: &'static str, tag: String },
    /// Window or GPU initialization failed.
    Gpu(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::DuplicateTag { kind, tag } => {
                write!(f, "{kind} '{tag}' is already registered")
            }
            EngineError::UnknownTag { kind, tag } => write!(f, "no {kind} registered as '{tag}'"),
            EngineError::LayerOutOfRange(ordinal) => {
                write!(f, "render layer {ordinal} is out of range")
            }
            EngineError::LayerTaken { ordinal, owner } => {
                write!(f, "render layer {ordinal} is already used by '{owner}'")
            }
            EngineError::LayerCapacity => write!(f, "all render layer slots are in use"),
            EngineError::FontSize(size) => write!(f, "font pixel size {size} is not supported"),
            EngineError::AssetLoad { path, reason } => {
                write!(f, "failed to load '{path}': {reason}")
            }
            EngineError::Shader(e) => write!(f, "shader creation failed: {e}"),
            EngineError::InUse { kind, tag } => write!(f, "{kind} '{tag}' is still in use"),
            EngineError::Gpu(e) => write!(f, "gpu initialization failed: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_tag() {
        let err = EngineError::DuplicateTag {
            kind: "texture",
            tag: "player".into(),
        };
        assert_eq!(err.to_string(), "texture 'player' is already registered");
    }
}
