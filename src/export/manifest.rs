//! The serialized project manifest carried inside every archive.

use crate::archive::ProjectArchive;
use crate::models::{
    AnchoringMode, AnnotationLayer, LayerType, OverlapMode, SourceDocumentState, ValidationMode,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the manifest entry at the archive root.
pub const MANIFEST_ENTRY: &str = "exportedproject.json";

/// A source document record in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedSourceDocument {
    /// Document name, unique within the project.
    pub name: String,
    /// Lifecycle state at export time.
    pub state: SourceDocumentState,
}

/// An annotation layer record in the manifest.
///
/// Carries every schema attribute but no identity; imported layers receive
/// fresh ids from the schema storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedAnnotationLayer {
    /// Technical layer name.
    pub name: String,
    /// UI display name.
    pub ui_name: String,
    /// Structural kind.
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    /// Whether the layer ships with the platform.
    pub built_in: bool,
    /// Anchoring behavior.
    pub anchoring_mode: AnchoringMode,
    /// Overlap behavior.
    pub overlap_mode: OverlapMode,
    /// Validation behavior.
    pub validation_mode: ValidationMode,
}

impl From<&AnnotationLayer> for ExportedAnnotationLayer {
    fn from(layer: &AnnotationLayer) -> Self {
        Self {
            name: layer.name.clone(),
            ui_name: layer.ui_name.clone(),
            layer_type: layer.layer_type,
            built_in: layer.built_in,
            anchoring_mode: layer.anchoring_mode,
            overlap_mode: layer.overlap_mode,
            validation_mode: layer.validation_mode,
        }
    }
}

impl ExportedAnnotationLayer {
    /// Materializes the record as an unpersisted layer (no id).
    #[must_use]
    pub fn to_layer(&self) -> AnnotationLayer {
        AnnotationLayer::new(&self.name, &self.ui_name, self.layer_type)
            .with_built_in(self.built_in)
            .with_anchoring_mode(self.anchoring_mode)
            .with_overlap_mode(self.overlap_mode)
            .with_validation_mode(self.validation_mode)
    }
}

/// Project metadata accumulated by export units and consumed by import
/// units.
///
/// Owned by exactly one pipeline run; serialized as
/// [`MANIFEST_ENTRY`] at the archive root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportedProjectManifest {
    /// Name of the exported project.
    pub name: String,
    /// Source document records, filled by the source-documents unit.
    #[serde(default)]
    pub source_documents: Vec<ExportedSourceDocument>,
    /// Annotation layer records, filled by the layers unit.
    #[serde(default)]
    pub layers: Vec<ExportedAnnotationLayer>,
    /// Free-form project settings.
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl ExportedProjectManifest {
    /// Creates an empty manifest for a project.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Writes the manifest into the staging tree as [`MANIFEST_ENTRY`].
    pub fn save(&self, stage: &Path) -> Result<()> {
        let rendered = serde_json::to_vec_pretty(self).map_err(|e| Error::OperationFailed {
            operation: "serialize_manifest".to_string(),
            cause: e.to_string(),
        })?;
        std::fs::write(stage.join(MANIFEST_ENTRY), rendered)
            .map_err(|e| Error::io("write_manifest", &e))
    }

    /// Loads the manifest from an opened archive.
    pub fn load(archive: &mut ProjectArchive) -> Result<Self> {
        let content = archive.read(MANIFEST_ENTRY)?;
        serde_json::from_slice(&content).map_err(|e| Error::OperationFailed {
            operation: "parse_manifest".to_string(),
            cause: e.to_string(),
        })
    }
}
