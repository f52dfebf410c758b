//! # Annex
//!
//! Project export/import engine for multi-user annotation platforms.
//!
//! Annex packages an annotation project's state (source documents, annotation
//! layers, per-user curated annotation state) into a portable zip archive and
//! reconstructs a project from such an archive.
//!
//! ## Features
//!
//! - Pluggable exporter/importer units with declared ordering dependencies
//! - Deterministic dependency resolution with cycle detection
//! - Verbatim round-tripping of serialized annotation state (CAS blobs)
//! - Secondary human-readable exports via a format-converter registry
//! - Cancellable background export jobs with observable state and progress
//! - Backward-compatible archive entry handling (legacy leading-slash names)
//!
//! ## Example
//!
//! ```rust,ignore
//! use annex::{ExportJob, ExportRequest, FORMAT_AUTO};
//!
//! let job = ExportJob::new(service);
//! job.start(ExportRequest::new(project, FORMAT_AUTO, false))?;
//! while !job.state().is_terminal() {
//!     println!("progress: {}%", job.progress());
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

// Module declarations
pub mod archive;
pub mod export;
pub mod formats;
pub mod models;
pub mod observability;
pub mod store;

// Re-exports for convenience
pub use export::{
    CuratedDocumentsExporter, ExportJob, ExportRequest, ExportedProjectManifest, ImportRequest,
    JobState, LayersExporter, MessageQueue, ProgressCell, ProjectExportService, ProjectExporter,
    SourceDocumentsExporter, UnitId,
};
pub use formats::{FORMAT_AUTO, FormatRegistry, FormatSupport};
pub use models::{
    AnnotationLayer, LogMessage, MessageLevel, Project, SourceDocument, SourceDocumentState,
};
pub use store::{AnnotationSchemaStorage, DocumentStorage, FsRepository};

/// Error type for annex operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed entry names, empty unit selections |
/// | `OperationFailed` | I/O errors, zip read/write failures, manifest (de)serialization |
/// | `CyclicDependency` | The selected units declare a dependency cycle |
/// | `UnknownDependency` | A unit depends on an id never registered with the service |
/// | `ExportAborted` | A unit hit an unrecoverable error mid-export |
/// | `DocumentNotFound` | An archive entry references a document the project does not have |
/// | `JobAlreadyActive` | `ExportJob::start` called twice on one controller |
/// | `Cancelled` | The job's cancellation token was observed at a blocking boundary |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur (staging, CAS copy, source copy)
    /// - The zip container cannot be read or written
    /// - The project manifest cannot be serialized or parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The units selected for a run declare a dependency cycle.
    ///
    /// Detected before any unit executes; the run never starts.
    #[error("cyclic dependency among export units: {cycle}")]
    CyclicDependency {
        /// The unit ids participating in the cycle.
        cycle: String,
    },

    /// A unit declares a dependency on an id that was never registered.
    ///
    /// Raised at service construction time. A dependency on a unit that is
    /// registered but absent from a particular run is not an error.
    #[error("unit '{unit}' depends on unregistered unit '{dependency}'")]
    UnknownDependency {
        /// The unit declaring the dependency.
        unit: String,
        /// The missing dependency id.
        dependency: String,
    },

    /// A unit hit an unrecoverable error; the whole export run is aborted.
    ///
    /// The staging area is discarded wholesale; no partial archive is
    /// produced.
    #[error("export aborted: {0}")]
    ExportAborted(String),

    /// An archive entry references a document the target project does not
    /// have.
    #[error("no document named '{document}' in project '{project}'")]
    DocumentNotFound {
        /// The project that was searched.
        project: String,
        /// The document name from the archive entry.
        document: String,
    },

    /// A second job was started on a controller that already ran one.
    #[error("an export job is already active on this controller")]
    JobAlreadyActive,

    /// The operation was cancelled via the job's cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Wraps an I/O error with the name of the failed operation.
    pub(crate) fn io(operation: impl Into<String>, err: &std::io::Error) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: err.to_string(),
        }
    }

    /// Wraps a zip container error with the name of the failed operation.
    pub(crate) fn zip(operation: impl Into<String>, err: &zip::result::ZipError) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: err.to_string(),
        }
    }
}

/// Result type alias for annex operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "pack_archive".to_string(),
            cause: "disk full".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'pack_archive' failed: disk full");

        let err = Error::UnknownDependency {
            unit: "curated_documents".to_string(),
            dependency: "bogus".to_string(),
        };
        assert!(err.to_string().contains("unregistered unit 'bogus'"));
    }
}
