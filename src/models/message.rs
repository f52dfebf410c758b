//! Log messages surfaced to the caller of an export/import run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a [`LogMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    /// Informational note.
    Info,
    /// Recoverable anomaly; the run continued with a substitute.
    Warn,
    /// Diagnostic for a failed or partially failed operation.
    Error,
}

/// A message emitted by a unit or the job worker during a run.
///
/// Messages accumulate in the run's queue in emission order and are drained
/// destructively by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Severity.
    pub level: MessageLevel,
    /// Human-readable text.
    pub message: String,
}

impl LogMessage {
    /// Creates an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            message: message.into(),
        }
    }

    /// Creates a warning message.
    #[must_use]
    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warn,
            message: message.into(),
        }
    }

    /// Creates an error message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.level, self.message)
    }
}
