//! Annotation-layer export/import unit.

use crate::archive::ProjectArchive;
use crate::export::manifest::{ExportedAnnotationLayer, ExportedProjectManifest};
use crate::export::request::{ExportRequest, ImportRequest};
use crate::export::unit::{ProjectExporter, UnitId};
use crate::models::Project;
use crate::store::AnnotationSchemaStorage;
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// Exports the project's annotation schema into the manifest; no archive
/// entries of its own. Import recreates every layer with a fresh id.
pub struct LayersExporter {
    schema: Arc<dyn AnnotationSchemaStorage>,
}

impl LayersExporter {
    /// Unit identity.
    pub const ID: UnitId = "annotation_layers";

    /// Creates the unit over the platform's schema storage.
    #[must_use]
    pub fn new(schema: Arc<dyn AnnotationSchemaStorage>) -> Self {
        Self { schema }
    }
}

impl ProjectExporter for LayersExporter {
    fn id(&self) -> UnitId {
        Self::ID
    }

    fn export_data(
        &self,
        request: &ExportRequest,
        manifest: &mut ExportedProjectManifest,
        _stage: &Path,
    ) -> Result<()> {
        let layers = self.schema.list_layers(&request.project)?;
        let total = layers.len();
        for (done, layer) in layers.iter().enumerate() {
            request.check_cancelled()?;
            manifest.layers.push(ExportedAnnotationLayer::from(layer));
            request.update_unit_progress(done + 1, total);
        }
        Ok(())
    }

    fn import_data(
        &self,
        request: &ImportRequest,
        project: &Project,
        manifest: &ExportedProjectManifest,
        _archive: &mut ProjectArchive,
    ) -> Result<()> {
        for record in &manifest.layers {
            request.check_cancelled()?;
            let stored = self.schema.create_layer(project, record.to_layer())?;
            tracing::debug!(layer = %stored.name, project = %project.name, "imported layer");
        }
        Ok(())
    }
}
