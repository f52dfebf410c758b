//! Curated-document export/import unit.

use crate::archive::{self, ProjectArchive};
use crate::export::manifest::ExportedProjectManifest;
use crate::export::request::{ExportRequest, ImportRequest};
use crate::export::unit::{ProjectExporter, UnitId};
use crate::formats::{FORMAT_AUTO, FormatRegistry, FormatSupport};
use crate::models::{CURATION_USER, Project, SourceDocument, SourceDocumentState};
use crate::store::DocumentStorage;
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Reserved top-level archive folder for the human-readable secondary
/// exports. Write-only; never read on import.
const CURATION_FOLDER: &str = "curation";
/// Reserved top-level archive folder for the verbatim serialized CAS blobs.
const CURATION_CAS_FOLDER: &str = "curation_ser";

/// Exports the curated annotation state of every finished document: the
/// serialized CAS verbatim (used on re-import) plus a secondary rendering in
/// the requested format (documentation only).
pub struct CuratedDocumentsExporter {
    documents: Arc<dyn DocumentStorage>,
    formats: FormatRegistry,
}

impl CuratedDocumentsExporter {
    /// Unit identity.
    pub const ID: UnitId = "curated_documents";

    /// Creates the unit over the platform's document storage and format
    /// registry.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStorage>, formats: FormatRegistry) -> Self {
        Self { documents, formats }
    }

    /// Resolves the request's format selection, falling back to the default
    /// converter with a warning when the requested id has no writer.
    fn select_format(&self, request: &ExportRequest) -> Arc<dyn FormatSupport> {
        if request.format == FORMAT_AUTO {
            return FormatRegistry::default_format();
        }
        self.formats
            .writable_format_by_id(&request.format)
            .unwrap_or_else(|| {
                let fallback = FormatRegistry::default_format();
                request.add_message(crate::models::LogMessage::warn(format!(
                    "No writer found for format [{}] - exporting as {} instead",
                    request.format,
                    fallback.name()
                )));
                fallback
            })
    }

    /// Whether this document's curation state is included in the export.
    fn includes(request: &ExportRequest, document: &SourceDocument) -> bool {
        document.state == SourceDocumentState::CurationFinished
            || (request.include_in_progress
                && document.state == SourceDocumentState::CurationInProgress)
    }

    /// Renders the secondary export into a scratch directory, copies it next
    /// to the staged CAS and deletes the scratch copy.
    fn stage_secondary_export(
        &self,
        format: &dyn FormatSupport,
        document: &SourceDocument,
        cas: &[u8],
        curation_dir: &Path,
    ) -> Result<()> {
        let scratch = tempfile::tempdir().map_err(|e| Error::io("create_scratch_dir", &e))?;
        let rendered = format.write_document(document, CURATION_USER, cas, scratch.path())?;
        let file_name = rendered
            .file_name()
            .ok_or_else(|| Error::InvalidInput("converter returned a bare path".to_string()))?;
        std::fs::copy(&rendered, curation_dir.join(file_name))
            .map_err(|e| Error::io("stage_secondary_export", &e))?;
        std::fs::remove_file(&rendered).map_err(|e| Error::io("remove_scratch_export", &e))?;
        Ok(())
    }
}

impl ProjectExporter for CuratedDocumentsExporter {
    fn id(&self) -> UnitId {
        Self::ID
    }

    /// The curated CAS references documents by name, so their records must
    /// already be imported.
    fn import_dependencies(&self) -> Vec<UnitId> {
        vec![super::SourceDocumentsExporter::ID]
    }

    fn export_data(
        &self,
        request: &ExportRequest,
        _manifest: &mut ExportedProjectManifest,
        stage: &Path,
    ) -> Result<()> {
        let documents = self.documents.list_source_documents(&request.project)?;
        let format = self.select_format(request);

        let total = documents.len();
        for (done, document) in documents.iter().enumerate() {
            request.check_cancelled()?;

            let cas_dir = archive::stage_dir(stage, &[CURATION_CAS_FOLDER, &document.name])?;
            let curation_dir = archive::stage_dir(stage, &[CURATION_FOLDER, &document.name])?;

            if Self::includes(request, document) {
                let cas_file = self
                    .documents
                    .cas_file(&request.project, document, CURATION_USER);
                if cas_file.exists() {
                    // Verbatim CAS copy - this is what import reads back.
                    std::fs::copy(&cas_file, cas_dir.join(format!("{CURATION_USER}.ser")))
                        .map_err(|e| Error::io("stage_curated_cas", &e))?;

                    // Secondary export for convenience - not used during
                    // import. A failure here aborts the whole run; a
                    // partially rendered secondary set would be misleading.
                    let cas = std::fs::read(&cas_file)
                        .map_err(|e| Error::io("read_curated_cas", &e))?;
                    self.stage_secondary_export(
                        format.as_ref(),
                        document,
                        &cas,
                        &curation_dir,
                    )
                    .map_err(|err| {
                        tracing::error!(
                            document = %document.name,
                            error = %err,
                            "secondary export failed"
                        );
                        Error::ExportAborted(
                            "Aborting due to unrecoverable error while exporting".to_string(),
                        )
                    })?;
                }
            }

            request.update_unit_progress(done + 1, total);
        }
        Ok(())
    }

    fn import_data(
        &self,
        request: &ImportRequest,
        project: &Project,
        _manifest: &ExportedProjectManifest,
        archive: &mut ProjectArchive,
    ) -> Result<()> {
        let prefix = format!("{CURATION_CAS_FOLDER}/");
        for entry in archive.entries_under_prefix(&prefix) {
            request.check_cancelled()?;
            tracing::trace!(entry = %entry, "considering archive entry");

            let rel = &entry[prefix.len()..];
            let Some((document_path, file_name)) = rel.rsplit_once('/') else {
                // Entry directly under the prefix: no document component.
                continue;
            };
            let document_name = document_path.replace('/', "");
            if document_name.trim().is_empty() {
                continue;
            }
            let user = file_name.strip_suffix(".ser").unwrap_or(file_name);

            let document = self.documents.get_source_document(project, &document_name)?;
            let target = self.documents.cas_file(project, &document, user);
            let content = archive.read(&entry)?;
            crate::store::write_blob(&target, &content)?;

            tracing::info!(
                user = %user,
                document = %document.name,
                project = %project.name,
                "imported curated document content"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsRepository;

    fn seeded_repo() -> (tempfile::TempDir, Arc<FsRepository>, Project) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(FsRepository::new(dir.path()));
        let project = Project::new("p1");

        let finished =
            SourceDocument::new("done.txt").with_state(SourceDocumentState::CurationFinished);
        repo.write_cas(&project, &finished, CURATION_USER, b"\x00finished\xff")
            .unwrap();
        repo.create_source_document(&project, finished).unwrap();

        let in_progress =
            SourceDocument::new("wip.txt").with_state(SourceDocumentState::CurationInProgress);
        repo.write_cas(&project, &in_progress, CURATION_USER, b"wip")
            .unwrap();
        repo.create_source_document(&project, in_progress).unwrap();

        let untouched = SourceDocument::new("raw.txt");
        repo.create_source_document(&project, untouched).unwrap();

        (dir, repo, project)
    }

    fn unit(repo: &Arc<FsRepository>) -> CuratedDocumentsExporter {
        CuratedDocumentsExporter::new(
            Arc::clone(repo) as Arc<dyn DocumentStorage>,
            FormatRegistry::with_defaults(),
        )
    }

    #[test]
    fn test_exports_only_finished_documents_by_default() {
        let (_dir, repo, project) = seeded_repo();
        let stage = tempfile::tempdir().unwrap();
        let request = ExportRequest::new(project, FORMAT_AUTO, false);
        let mut manifest = ExportedProjectManifest::new("p1");

        unit(&repo)
            .export_data(&request, &mut manifest, stage.path())
            .unwrap();

        let staged = stage.path().join("curation_ser/done.txt/CURATION_USER.ser");
        assert_eq!(std::fs::read(staged).unwrap(), b"\x00finished\xff");
        assert!(!stage.path().join("curation_ser/wip.txt/CURATION_USER.ser").exists());
        // Secondary export sits under curation/, rendered with the default
        // converter.
        assert!(stage.path().join("curation/done.txt/CURATION_USER.json").exists());
    }

    #[test]
    fn test_in_progress_documents_are_opt_in() {
        let (_dir, repo, project) = seeded_repo();
        let stage = tempfile::tempdir().unwrap();
        let request = ExportRequest::new(project, FORMAT_AUTO, true);
        let mut manifest = ExportedProjectManifest::new("p1");

        unit(&repo)
            .export_data(&request, &mut manifest, stage.path())
            .unwrap();

        assert!(stage.path().join("curation_ser/done.txt/CURATION_USER.ser").exists());
        assert!(stage.path().join("curation_ser/wip.txt/CURATION_USER.ser").exists());
    }

    #[test]
    fn test_unknown_format_falls_back_with_warning() {
        let (_dir, repo, project) = seeded_repo();
        let stage = tempfile::tempdir().unwrap();
        let request = ExportRequest::new(project, "bogus", false);
        let mut manifest = ExportedProjectManifest::new("p1");

        unit(&repo)
            .export_data(&request, &mut manifest, stage.path())
            .unwrap();

        let messages = request.message_queue().drain();
        assert!(messages.iter().any(|m| {
            m.level == crate::models::MessageLevel::Warn
                && m.message.contains("No writer found for format [bogus]")
        }));
        assert!(stage.path().join("curation/done.txt/CURATION_USER.json").exists());
    }

    #[test]
    fn test_explicit_format_selection() {
        let (_dir, repo, project) = seeded_repo();
        let stage = tempfile::tempdir().unwrap();
        let request = ExportRequest::new(project, "text", false);
        let mut manifest = ExportedProjectManifest::new("p1");

        unit(&repo)
            .export_data(&request, &mut manifest, stage.path())
            .unwrap();

        assert!(stage.path().join("curation/done.txt/CURATION_USER.txt").exists());
        assert!(request.message_queue().is_empty());
    }

    #[test]
    fn test_secondary_export_failure_aborts_the_run() {
        struct BrokenFormat;
        impl FormatSupport for BrokenFormat {
            fn id(&self) -> &'static str {
                "broken"
            }
            fn name(&self) -> &'static str {
                "Broken"
            }
            fn extension(&self) -> &'static str {
                "broken"
            }
            fn write_document(
                &self,
                _document: &SourceDocument,
                _user: &str,
                _cas: &[u8],
                _target_dir: &Path,
            ) -> Result<std::path::PathBuf> {
                Err(Error::OperationFailed {
                    operation: "render".to_string(),
                    cause: "converter exploded".to_string(),
                })
            }
        }

        let (_dir, repo, project) = seeded_repo();
        let mut formats = FormatRegistry::with_defaults();
        formats.register(Arc::new(BrokenFormat));
        let exporter =
            CuratedDocumentsExporter::new(Arc::clone(&repo) as Arc<dyn DocumentStorage>, formats);

        let stage = tempfile::tempdir().unwrap();
        let request = ExportRequest::new(project, "broken", false);
        let mut manifest = ExportedProjectManifest::new("p1");

        let err = exporter
            .export_data(&request, &mut manifest, stage.path())
            .unwrap_err();
        assert!(matches!(err, Error::ExportAborted(_)));
    }

    #[test]
    fn test_import_skips_prefix_only_entries() {
        let (_dir, repo, project) = seeded_repo();

        // Hand-build an archive containing a prefix-only entry and a real
        // one.
        let staging = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(staging.path().join("curation_ser/done.txt")).unwrap();
        std::fs::write(
            staging.path().join("curation_ser/done.txt/CURATION_USER.ser"),
            b"imported",
        )
        .unwrap();
        std::fs::write(staging.path().join("curation_ser/stray.ser"), b"orphan").unwrap();
        let out = tempfile::tempdir().unwrap();
        let archive_path = out.path().join("a.zip");
        crate::archive::pack(staging.path(), &archive_path).unwrap();

        let mut archive = ProjectArchive::open(&archive_path).unwrap();
        unit(&repo)
            .import_data(
                &ImportRequest::new(),
                &project,
                &ExportedProjectManifest::new("p1"),
                &mut archive,
            )
            .unwrap();

        let document = repo.get_source_document(&project, "done.txt").unwrap();
        let target = repo.cas_file(&project, &document, CURATION_USER);
        assert_eq!(std::fs::read(target).unwrap(), b"imported");
    }
}
