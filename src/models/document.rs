//! Source documents and their annotation lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reserved user name under which the curated (merged) annotation state of a
/// document is stored.
pub const CURATION_USER: &str = "CURATION_USER";

/// Unique source document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generates a new random document id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Annotation lifecycle state of a source document.
///
/// Only the two curation states matter to the curated-documents exporter; the
/// rest exist so the document listing is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceDocumentState {
    /// No user has started annotating yet.
    #[default]
    NotStarted,
    /// At least one user is annotating.
    AnnotationInProgress,
    /// All annotators have marked the document finished.
    AnnotationFinished,
    /// A curator has started merging annotations.
    CurationInProgress,
    /// Curation is complete.
    CurationFinished,
}

impl SourceDocumentState {
    /// Returns the state as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::AnnotationInProgress => "ANNOTATION_IN_PROGRESS",
            Self::AnnotationFinished => "ANNOTATION_FINISHED",
            Self::CurationInProgress => "CURATION_IN_PROGRESS",
            Self::CurationFinished => "CURATION_FINISHED",
        }
    }
}

impl fmt::Display for SourceDocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source document of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Unique document identifier.
    pub id: DocumentId,
    /// Document name, unique within its project.
    pub name: String,
    /// Current annotation lifecycle state.
    pub state: SourceDocumentState,
}

impl SourceDocument {
    /// Creates a document with a fresh id in the initial state.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            state: SourceDocumentState::NotStarted,
        }
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub const fn with_state(mut self, state: SourceDocumentState) -> Self {
        self.state = state;
        self
    }
}
