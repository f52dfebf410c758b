//! Data models for annex.
//!
//! This module contains the core data structures shared by the export/import
//! pipeline and its storage collaborators.

mod document;
mod layer;
mod message;
mod project;

pub use document::{CURATION_USER, DocumentId, SourceDocument, SourceDocumentState};
pub use layer::{AnchoringMode, AnnotationLayer, LayerId, LayerType, OverlapMode, ValidationMode};
pub use message::{LogMessage, MessageLevel};
pub use project::{Project, ProjectId};
