//! Annotation layer schema types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique annotation layer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(Uuid);

impl LayerId {
    /// Generates a new random layer id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Structural kind of an annotation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Annotations over a contiguous region of text.
    Span,
    /// Directed connections between two span annotations.
    Relation,
    /// Ordered chains of span annotations (e.g. coreference).
    Chain,
}

/// How span annotations attach to the underlying text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchoringMode {
    /// Exactly one token.
    SingleToken,
    /// One or more whole tokens.
    Tokens,
    /// One or more whole sentences.
    Sentences,
}

/// Whether annotations on a layer may overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlapMode {
    /// Overlapping annotations are rejected.
    NoOverlap,
    /// Any overlap is permitted.
    AnyOverlap,
}

/// When annotations on a layer are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationMode {
    /// Validate on every change.
    #[default]
    Always,
    /// Never validate.
    Never,
}

/// An annotation layer definition.
///
/// The id is assigned by the schema storage when the layer is created;
/// imported layers always receive fresh ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationLayer {
    /// Storage-assigned identifier, `None` until the layer is persisted.
    pub id: Option<LayerId>,
    /// Technical name, e.g. `custom.Span`.
    pub name: String,
    /// Name shown in the annotation UI.
    pub ui_name: String,
    /// Structural kind.
    pub layer_type: LayerType,
    /// Whether the layer ships with the platform (not user-defined).
    pub built_in: bool,
    /// Anchoring behavior for span annotations.
    pub anchoring_mode: AnchoringMode,
    /// Overlap behavior.
    pub overlap_mode: OverlapMode,
    /// Validation behavior.
    pub validation_mode: ValidationMode,
}

impl AnnotationLayer {
    /// Creates a span layer with default modes; adjust with the `with_*`
    /// builders.
    #[must_use]
    pub fn new(name: impl Into<String>, ui_name: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            id: None,
            name: name.into(),
            ui_name: ui_name.into(),
            layer_type,
            built_in: false,
            anchoring_mode: AnchoringMode::Tokens,
            overlap_mode: OverlapMode::NoOverlap,
            validation_mode: ValidationMode::Always,
        }
    }

    /// Marks the layer as built-in.
    #[must_use]
    pub const fn with_built_in(mut self, built_in: bool) -> Self {
        self.built_in = built_in;
        self
    }

    /// Sets the anchoring mode.
    #[must_use]
    pub const fn with_anchoring_mode(mut self, mode: AnchoringMode) -> Self {
        self.anchoring_mode = mode;
        self
    }

    /// Sets the overlap mode.
    #[must_use]
    pub const fn with_overlap_mode(mut self, mode: OverlapMode) -> Self {
        self.overlap_mode = mode;
        self
    }

    /// Sets the validation mode.
    #[must_use]
    pub const fn with_validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation_mode = mode;
        self
    }

    /// Returns a copy with the id cleared, for identity-insensitive
    /// comparisons.
    #[must_use]
    pub fn without_id(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }
}
