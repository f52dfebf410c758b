//! JSON secondary-export converter (default).

use super::FormatSupport;
use crate::models::SourceDocument;
use crate::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Envelope written for each `(document, user)` pair.
#[derive(Serialize)]
struct CasEnvelope<'a> {
    document: &'a str,
    user: &'a str,
    size_bytes: usize,
    /// The opaque serialized annotation state, base64-encoded.
    content: String,
}

/// Default converter: a JSON envelope around the opaque CAS payload.
///
/// Always available, so it doubles as the fallback when a requested format
/// has no registered writer.
pub struct JsonCasFormat;

impl FormatSupport for JsonCasFormat {
    fn id(&self) -> &'static str {
        "json"
    }

    fn name(&self) -> &'static str {
        "Annotation JSON"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn write_document(
        &self,
        document: &SourceDocument,
        user: &str,
        cas: &[u8],
        target_dir: &Path,
    ) -> Result<PathBuf> {
        let envelope = CasEnvelope {
            document: &document.name,
            user,
            size_bytes: cas.len(),
            content: STANDARD.encode(cas),
        };

        let path = target_dir.join(format!("{user}.{}", self.extension()));
        let rendered =
            serde_json::to_vec_pretty(&envelope).map_err(|e| Error::OperationFailed {
                operation: "render_json_export".to_string(),
                cause: e.to_string(),
            })?;
        std::fs::write(&path, rendered).map_err(|e| Error::io("render_json_export", &e))?;
        Ok(path)
    }
}
