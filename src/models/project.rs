//! Project identity and metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique project identifier.
///
/// Generated fresh for every project; archive import never reuses the ids of
/// the exporting installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Generates a new random project id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An annotation project.
///
/// Only the fields the export/import engine needs; everything else about a
/// project lives with the platform that embeds the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Human-readable project name, unique per installation.
    pub name: String,
}

impl Project {
    /// Creates a project with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
        }
    }
}
