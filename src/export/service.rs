//! Orchestration of whole export/import runs.

use super::manifest::ExportedProjectManifest;
use super::pipeline::{ExportPipeline, ImportPipeline};
use super::request::{ExportRequest, ImportRequest};
use super::resolver;
use super::unit::{ProjectExporter, UnitId};
use crate::archive::{self, ProjectArchive};
use crate::models::{LogMessage, Project};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Coordinates exporter/importer units, staging trees and the archive codec
/// for whole-project export and import.
pub struct ProjectExportService {
    units: Vec<Arc<dyn ProjectExporter>>,
    work_dir: Option<PathBuf>,
}

impl ProjectExportService {
    /// Creates a service over the given units.
    ///
    /// # Errors
    ///
    /// Fails closed with [`Error::UnknownDependency`] if any unit declares a
    /// dependency on an id that is not registered here.
    pub fn new(units: Vec<Arc<dyn ProjectExporter>>) -> Result<Self> {
        resolver::validate_registry(&units)?;
        Ok(Self {
            units,
            work_dir: None,
        })
    }

    /// Directs staging trees and finished archives into `dir` instead of the
    /// system temp directory.
    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Ids of all registered units, in registration order.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|unit| unit.id()).collect()
    }

    fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Exports the whole project and returns the finished archive's path.
    ///
    /// Runs every registered unit in resolved order against a transient
    /// staging tree, writes the manifest, packs the tree into a zip file and
    /// discards the staging tree. On any unit error the staging tree is
    /// discarded wholesale and no archive is produced.
    pub fn export_project(&self, request: &ExportRequest) -> Result<PathBuf> {
        self.export_units(request, self.units.clone())
    }

    /// Exports only the selected units (dependencies absent from the
    /// selection are ignored by the resolver).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `unit_ids` selects nothing.
    pub fn export_partial(&self, request: &ExportRequest, unit_ids: &[UnitId]) -> Result<PathBuf> {
        let selected: Vec<_> = self
            .units
            .iter()
            .filter(|unit| unit_ids.contains(&unit.id()))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(Error::InvalidInput(
                "no registered unit matches the selection".to_string(),
            ));
        }
        self.export_units(request, selected)
    }

    fn export_units(
        &self,
        request: &ExportRequest,
        units: Vec<Arc<dyn ProjectExporter>>,
    ) -> Result<PathBuf> {
        let work_dir = self.work_dir();
        std::fs::create_dir_all(&work_dir).map_err(|e| Error::io("create_work_dir", &e))?;
        let staging = tempfile::Builder::new()
            .prefix("annex-export-")
            .tempdir_in(&work_dir)
            .map_err(|e| Error::io("create_staging_dir", &e))?;

        let mut manifest = ExportedProjectManifest::new(&request.project.name);
        let mut pipeline = ExportPipeline::new(units);
        pipeline.run(request, &mut manifest, staging.path())?;
        manifest.save(staging.path())?;

        let target = work_dir.join(archive_file_name(&request.project));
        archive::pack(staging.path(), &target)?;
        tracing::info!(
            project = %request.project.name,
            archive = %target.display(),
            "project export complete"
        );

        // The archive is already safe; a leftover staging tree is only worth
        // a message.
        if let Err(err) = staging.close() {
            request.add_message(LogMessage::error(format!(
                "Unable to delete temporary export directory: {err}"
            )));
        }

        Ok(target)
    }

    /// Imports an exported archive into `project`.
    ///
    /// The project itself must already exist; units recreate documents,
    /// layers and annotation state inside it in resolved import order.
    pub fn import_project(
        &self,
        request: &ImportRequest,
        project: &Project,
        archive_path: &Path,
    ) -> Result<()> {
        let mut archive = ProjectArchive::open(archive_path)?;
        let manifest = ExportedProjectManifest::load(&mut archive)?;

        let mut pipeline = ImportPipeline::new(self.units.clone());
        pipeline.run(request, project, &manifest, &mut archive)?;
        tracing::info!(
            project = %project.name,
            archive = %archive_path.display(),
            "project import complete"
        );
        Ok(())
    }
}

/// `<project>_<timestamp>.zip`, with filesystem-hostile characters mapped
/// away.
fn archive_file_name(project: &Project) -> String {
    let name: String = project
        .name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H%M%S");
    format!("{name}_{timestamp}.zip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_file_name_sanitizes() {
        let project = Project::new("My Project/2024");
        let name = archive_file_name(&project);
        assert!(name.starts_with("My_Project_2024_"));
        assert!(name.ends_with(".zip"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let service = ProjectExportService::new(Vec::new()).unwrap();
        let request = ExportRequest::new(Project::new("p1"), crate::FORMAT_AUTO, false);
        let err = service.export_partial(&request, &["nope"]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
