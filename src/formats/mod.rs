//! Format converters for secondary (human-readable) exports.
//!
//! The curated-documents exporter copies the serialized CAS verbatim for
//! re-import and, alongside it, renders each document through a
//! [`FormatSupport`] converter purely for human consumption. Converters are
//! looked up by id in the [`FormatRegistry`]; an unknown id falls back to the
//! default converter with a warning.

pub mod json;
pub mod text;

use crate::models::SourceDocument;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use json::JsonCasFormat;
pub use text::TextCasFormat;

/// Sentinel format id meaning "use the default converter".
pub const FORMAT_AUTO: &str = "auto";

/// A converter that renders one user's serialized annotation state over one
/// document into a secondary file format.
///
/// The CAS payload is opaque to the engine; converters decide how much of it
/// they can interpret. The rendering is best-effort documentation only and is
/// never read back on import.
pub trait FormatSupport: Send + Sync {
    /// Stable format identifier used for lookup, e.g. `json`.
    fn id(&self) -> &'static str;

    /// Human-readable format name.
    fn name(&self) -> &'static str;

    /// File extension written by this converter, without the dot.
    fn extension(&self) -> &'static str;

    /// Renders `cas` for `(document, user)` into a file under `target_dir`
    /// and returns the written path.
    ///
    /// # Errors
    ///
    /// Returns an error if the rendering cannot be produced; the caller
    /// treats this as unrecoverable for the whole export run.
    fn write_document(
        &self,
        document: &SourceDocument,
        user: &str,
        cas: &[u8],
        target_dir: &Path,
    ) -> Result<PathBuf>;
}

/// Registry of available format converters.
#[derive(Clone)]
pub struct FormatRegistry {
    formats: Vec<Arc<dyn FormatSupport>>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Creates a registry with the built-in converters.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonCasFormat));
        registry.register(Arc::new(TextCasFormat));
        registry
    }

    /// Registers a converter. A converter with the same id replaces the
    /// earlier registration.
    pub fn register(&mut self, format: Arc<dyn FormatSupport>) {
        self.formats.retain(|f| f.id() != format.id());
        self.formats.push(format);
    }

    /// Looks up a writable converter by id.
    #[must_use]
    pub fn writable_format_by_id(&self, id: &str) -> Option<Arc<dyn FormatSupport>> {
        self.formats.iter().find(|f| f.id() == id).cloned()
    }

    /// Returns the ids of all writable converters, sorted.
    #[must_use]
    pub fn writable_format_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.formats.iter().map(|f| f.id()).collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the default converter, used for [`FORMAT_AUTO`] and as the
    /// fallback when a requested format has no writer.
    #[must_use]
    pub fn default_format() -> Arc<dyn FormatSupport> {
        Arc::new(JsonCasFormat)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
