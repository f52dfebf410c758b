//! Source-document export/import unit.

use crate::archive::{self, ProjectArchive};
use crate::export::manifest::{ExportedProjectManifest, ExportedSourceDocument};
use crate::export::request::{ExportRequest, ImportRequest};
use crate::export::unit::{ProjectExporter, UnitId};
use crate::models::{Project, SourceDocument};
use crate::store::DocumentStorage;
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Reserved top-level archive folder for original source content.
pub(crate) const SOURCE_FOLDER: &str = "source";

/// Exports every source document's metadata into the manifest and its
/// original content under `source/`; import recreates the documents (with
/// fresh ids) before restoring the content.
///
/// Most other units resolve documents by name, so on import this unit runs
/// first.
pub struct SourceDocumentsExporter {
    documents: Arc<dyn DocumentStorage>,
}

impl SourceDocumentsExporter {
    /// Unit identity.
    pub const ID: UnitId = "source_documents";

    /// Creates the unit over the platform's document storage.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStorage>) -> Self {
        Self { documents }
    }
}

impl ProjectExporter for SourceDocumentsExporter {
    fn id(&self) -> UnitId {
        Self::ID
    }

    fn export_data(
        &self,
        request: &ExportRequest,
        manifest: &mut ExportedProjectManifest,
        stage: &Path,
    ) -> Result<()> {
        let documents = self.documents.list_source_documents(&request.project)?;
        let source_dir = archive::stage_dir(stage, &[SOURCE_FOLDER])?;

        let total = documents.len();
        for (done, document) in documents.iter().enumerate() {
            request.check_cancelled()?;

            manifest.source_documents.push(ExportedSourceDocument {
                name: document.name.clone(),
                state: document.state,
            });

            let source = self.documents.source_file(&request.project, document);
            if source.exists() {
                std::fs::copy(&source, source_dir.join(&document.name))
                    .map_err(|e| Error::io("stage_source_document", &e))?;
            }

            request.update_unit_progress(done + 1, total);
        }
        Ok(())
    }

    fn import_data(
        &self,
        request: &ImportRequest,
        project: &Project,
        manifest: &ExportedProjectManifest,
        archive: &mut ProjectArchive,
    ) -> Result<()> {
        for record in &manifest.source_documents {
            request.check_cancelled()?;
            self.documents.create_source_document(
                project,
                SourceDocument::new(&record.name).with_state(record.state),
            )?;
        }

        let prefix = format!("{SOURCE_FOLDER}/");
        for entry in archive.entries_under_prefix(&prefix) {
            request.check_cancelled()?;

            let name = &entry[prefix.len()..];
            if name.is_empty() {
                continue;
            }
            let document = self.documents.get_source_document(project, name)?;
            let target = self.documents.source_file(project, &document);
            let content = archive.read(&entry)?;
            crate::store::write_blob(&target, &content)?;
            tracing::info!(
                document = %document.name,
                project = %project.name,
                "imported source document content"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceDocumentState;
    use crate::store::FsRepository;
    use crate::FORMAT_AUTO;

    #[test]
    fn test_export_records_all_documents_and_stages_content() {
        let repo_dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(FsRepository::new(repo_dir.path()));
        let project = Project::new("p1");

        let with_content = SourceDocument::new("a.txt");
        repo.write_source(&project, &with_content, b"the text").unwrap();
        repo.create_source_document(&project, with_content).unwrap();
        repo.create_source_document(
            &project,
            SourceDocument::new("b.txt").with_state(SourceDocumentState::AnnotationFinished),
        )
        .unwrap();

        let stage = tempfile::tempdir().unwrap();
        let request = ExportRequest::new(project, FORMAT_AUTO, false);
        let mut manifest = ExportedProjectManifest::new("p1");

        SourceDocumentsExporter::new(repo)
            .export_data(&request, &mut manifest, stage.path())
            .unwrap();

        assert_eq!(manifest.source_documents.len(), 2);
        assert_eq!(
            std::fs::read(stage.path().join("source/a.txt")).unwrap(),
            b"the text"
        );
        assert!(!stage.path().join("source/b.txt").exists());
    }
}
