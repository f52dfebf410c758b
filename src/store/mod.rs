//! Storage collaborator contracts.
//!
//! The export/import engine does not own project data; it talks to the
//! platform's document and schema services through these traits. A
//! filesystem-backed reference implementation lives in [`fs`].

mod fs;

pub use fs::FsRepository;
pub(crate) use fs::write_blob;

use crate::models::{AnnotationLayer, Project, SourceDocument};
use crate::Result;
use std::path::PathBuf;

/// Access to a project's source documents and their serialized annotation
/// state.
///
/// The engine only ever reads document metadata; mutations are limited to
/// creating documents during import and writing blobs at the canonical
/// locations this trait reports.
pub trait DocumentStorage: Send + Sync {
    /// Lists all source documents of a project.
    fn list_source_documents(&self, project: &Project) -> Result<Vec<SourceDocument>>;

    /// Looks up one source document by name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DocumentNotFound`] if the project has no
    /// document with this name.
    fn get_source_document(&self, project: &Project, name: &str) -> Result<SourceDocument>;

    /// Registers a source document with a project.
    fn create_source_document(&self, project: &Project, document: SourceDocument) -> Result<()>;

    /// Returns true if any document of the project has curation state on
    /// disk.
    fn exists_curation_document(&self, project: &Project) -> Result<bool>;

    /// Canonical location of the serialized annotation state of `user` over
    /// `document` (`<document dir>/<user>.ser`). The file may not exist.
    fn cas_file(&self, project: &Project, document: &SourceDocument, user: &str) -> PathBuf;

    /// Canonical location of the original source content of `document`. The
    /// file may not exist.
    fn source_file(&self, project: &Project, document: &SourceDocument) -> PathBuf;
}

/// Access to a project's annotation schema.
pub trait AnnotationSchemaStorage: Send + Sync {
    /// Lists all annotation layers of a project.
    fn list_layers(&self, project: &Project) -> Result<Vec<AnnotationLayer>>;

    /// Persists a layer, assigning it a fresh id, and returns the stored
    /// layer.
    fn create_layer(&self, project: &Project, layer: AnnotationLayer) -> Result<AnnotationLayer>;
}
