//! Plain-text secondary-export converter.

use super::FormatSupport;
use crate::models::SourceDocument;
use crate::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Renders the CAS payload as a plain-text summary.
///
/// Binary payloads are rendered lossily; this converter exists for quick
/// eyeballing, not fidelity.
pub struct TextCasFormat;

impl FormatSupport for TextCasFormat {
    fn id(&self) -> &'static str {
        "text"
    }

    fn name(&self) -> &'static str {
        "Plain text"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn write_document(
        &self,
        document: &SourceDocument,
        user: &str,
        cas: &[u8],
        target_dir: &Path,
    ) -> Result<PathBuf> {
        let path = target_dir.join(format!("{user}.{}", self.extension()));
        let mut file =
            std::fs::File::create(&path).map_err(|e| Error::io("render_text_export", &e))?;

        writeln!(file, "document: {}", document.name)
            .and_then(|()| writeln!(file, "user: {user}"))
            .and_then(|()| writeln!(file, "state: {}", document.state))
            .and_then(|()| writeln!(file, "size: {} bytes", cas.len()))
            .and_then(|()| writeln!(file))
            .and_then(|()| file.write_all(String::from_utf8_lossy(cas).as_bytes()))
            .map_err(|e| Error::io("render_text_export", &e))?;

        Ok(path)
    }
}
