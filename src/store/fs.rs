//! Filesystem-backed reference repository.

use super::{AnnotationSchemaStorage, DocumentStorage};
use crate::models::{
    AnnotationLayer, CURATION_USER, LayerId, Project, ProjectId, SourceDocument,
    SourceDocumentState,
};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Stores document/layer metadata in memory and blobs (CAS files, source
/// files) on disk under a repository root.
///
/// Layout: `<root>/<project id>/document/<document name>/` holds `source`
/// plus one `<user>.ser` per annotator. Durable metadata persistence belongs
/// to the embedding platform; this repository carries exactly what the
/// engine and its tests need.
pub struct FsRepository {
    root: PathBuf,
    documents: RwLock<HashMap<ProjectId, Vec<SourceDocument>>>,
    layers: RwLock<HashMap<ProjectId, Vec<AnnotationLayer>>>,
}

impl FsRepository {
    /// Creates a repository rooted at `root`. The directory is created on
    /// first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            documents: RwLock::new(HashMap::new()),
            layers: RwLock::new(HashMap::new()),
        }
    }

    /// Directory holding all blobs of one document.
    #[must_use]
    pub fn document_dir(&self, project: &Project, document: &SourceDocument) -> PathBuf {
        self.root
            .join(project.id.to_string())
            .join("document")
            .join(&document.name)
    }

    /// Writes a document's serialized annotation state at its canonical
    /// location, creating parent directories as needed.
    pub fn write_cas(
        &self,
        project: &Project,
        document: &SourceDocument,
        user: &str,
        content: &[u8],
    ) -> Result<()> {
        write_blob(&self.cas_file(project, document, user), content)
    }

    /// Writes a document's original source content at its canonical location.
    pub fn write_source(
        &self,
        project: &Project,
        document: &SourceDocument,
        content: &[u8],
    ) -> Result<()> {
        write_blob(&self.source_file(project, document), content)
    }
}

pub(crate) fn write_blob(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io("write_blob", &e))?;
    }
    std::fs::write(path, content).map_err(|e| Error::io("write_blob", &e))
}

impl DocumentStorage for FsRepository {
    fn list_source_documents(&self, project: &Project) -> Result<Vec<SourceDocument>> {
        Ok(self
            .documents
            .read()
            .map_or_else(|_| Vec::new(), |map| map.get(&project.id).cloned().unwrap_or_default()))
    }

    fn get_source_document(&self, project: &Project, name: &str) -> Result<SourceDocument> {
        self.list_source_documents(project)?
            .into_iter()
            .find(|doc| doc.name == name)
            .ok_or_else(|| Error::DocumentNotFound {
                project: project.name.clone(),
                document: name.to_string(),
            })
    }

    fn create_source_document(&self, project: &Project, document: SourceDocument) -> Result<()> {
        let mut map = self
            .documents
            .write()
            .map_err(|_| Error::OperationFailed {
                operation: "create_source_document".to_string(),
                cause: "repository lock poisoned".to_string(),
            })?;
        map.entry(project.id).or_default().push(document);
        Ok(())
    }

    fn exists_curation_document(&self, project: &Project) -> Result<bool> {
        let documents = self.list_source_documents(project)?;
        Ok(documents.iter().any(|doc| {
            matches!(
                doc.state,
                SourceDocumentState::CurationInProgress | SourceDocumentState::CurationFinished
            ) && self.cas_file(project, doc, CURATION_USER).exists()
        }))
    }

    fn cas_file(&self, project: &Project, document: &SourceDocument, user: &str) -> PathBuf {
        self.document_dir(project, document).join(format!("{user}.ser"))
    }

    fn source_file(&self, project: &Project, document: &SourceDocument) -> PathBuf {
        self.document_dir(project, document).join("source")
    }
}

impl AnnotationSchemaStorage for FsRepository {
    fn list_layers(&self, project: &Project) -> Result<Vec<AnnotationLayer>> {
        Ok(self
            .layers
            .read()
            .map_or_else(|_| Vec::new(), |map| map.get(&project.id).cloned().unwrap_or_default()))
    }

    fn create_layer(&self, project: &Project, layer: AnnotationLayer) -> Result<AnnotationLayer> {
        let mut stored = layer;
        stored.id = Some(LayerId::new());

        let mut map = self.layers.write().map_err(|_| Error::OperationFailed {
            operation: "create_layer".to_string(),
            cause: "repository lock poisoned".to_string(),
        })?;
        map.entry(project.id).or_default().push(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LayerType;

    fn repo() -> (tempfile::TempDir, FsRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsRepository::new(dir.path());
        (dir, repo)
    }

    #[test]
    fn test_document_lookup_by_name() {
        let (_dir, repo) = repo();
        let project = Project::new("p1");
        repo.create_source_document(&project, SourceDocument::new("doc1.txt"))
            .unwrap();

        assert_eq!(
            repo.get_source_document(&project, "doc1.txt").unwrap().name,
            "doc1.txt"
        );
        assert!(matches!(
            repo.get_source_document(&project, "missing.txt"),
            Err(Error::DocumentNotFound { .. })
        ));
    }

    #[test]
    fn test_cas_round_trip_is_verbatim() {
        let (_dir, repo) = repo();
        let project = Project::new("p1");
        let doc = SourceDocument::new("doc1.txt");
        let payload = b"\x00\x01\xfe\xffnot utf8";

        repo.write_cas(&project, &doc, CURATION_USER, payload).unwrap();
        let path = repo.cas_file(&project, &doc, CURATION_USER);
        assert_eq!(std::fs::read(path).unwrap(), payload);
    }

    #[test]
    fn test_exists_curation_document_requires_state_and_blob() {
        let (_dir, repo) = repo();
        let project = Project::new("p1");

        let plain = SourceDocument::new("a.txt");
        repo.create_source_document(&project, plain).unwrap();
        assert!(!repo.exists_curation_document(&project).unwrap());

        let curated =
            SourceDocument::new("b.txt").with_state(SourceDocumentState::CurationFinished);
        repo.write_cas(&project, &curated, CURATION_USER, b"cas").unwrap();
        repo.create_source_document(&project, curated).unwrap();
        assert!(repo.exists_curation_document(&project).unwrap());
    }

    #[test]
    fn test_create_layer_assigns_id() {
        let (_dir, repo) = repo();
        let project = Project::new("p1");
        let layer = AnnotationLayer::new("custom.Span", "Span", LayerType::Span);

        let stored = repo.create_layer(&project, layer).unwrap();
        assert!(stored.id.is_some());
        assert_eq!(repo.list_layers(&project).unwrap(), vec![stored]);
    }
}
