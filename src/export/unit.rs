//! The exporter/importer unit contract.

use super::manifest::ExportedProjectManifest;
use super::request::{ExportRequest, ImportRequest};
use crate::archive::ProjectArchive;
use crate::models::Project;
use crate::Result;
use std::path::Path;

/// Stable identity of an exporter/importer unit.
///
/// Used in dependency declarations and run selections; new units pick a
/// fresh id without any change to the resolver or pipeline.
pub type UnitId = &'static str;

/// One pluggable export/import capability for a slice of project data.
///
/// The same concrete type provides both directions. Units write their slice
/// under a reserved top-level folder of the staging tree and read back only
/// entries under that prefix, so archives need no routing manifest.
pub trait ProjectExporter: Send + Sync {
    /// Stable unit identity.
    fn id(&self) -> UnitId;

    /// Units whose export must have run before this unit exports.
    fn export_dependencies(&self) -> Vec<UnitId> {
        Vec::new()
    }

    /// Units whose import must have run before this unit imports (their data
    /// must already exist so references resolve).
    fn import_dependencies(&self) -> Vec<UnitId> {
        Vec::new()
    }

    /// Writes this unit's slice of project state under `stage`.
    ///
    /// Recoverable anomalies are pushed to the request's message queue; any
    /// returned error aborts the whole run.
    fn export_data(
        &self,
        request: &ExportRequest,
        manifest: &mut ExportedProjectManifest,
        stage: &Path,
    ) -> Result<()>;

    /// Restores this unit's slice of project state from the archive into
    /// `project`.
    fn import_data(
        &self,
        request: &ImportRequest,
        project: &Project,
        manifest: &ExportedProjectManifest,
        archive: &mut ProjectArchive,
    ) -> Result<()>;
}
