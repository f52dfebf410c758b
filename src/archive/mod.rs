//! Archive codec: the on-disk container for exported projects.
//!
//! An exported project is a zip file whose entries use forward-slash paths.
//! Each exporter unit owns one or more reserved top-level folders, so import
//! can route entries to the right unit purely by prefix. Archives written by
//! legacy versions carried a leading slash on every entry name; all matching
//! here runs on [`normalize_entry_name`]d names so both layouts import
//! identically.

use crate::{Error, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Strips the historical leading slash from an archive entry name.
///
/// Legacy archives stored `/curation_ser/doc/user.ser`; current ones store
/// `curation_ser/doc/user.ser`. Every prefix match must use the normalized
/// form.
#[must_use]
pub fn normalize_entry_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

/// Creates (idempotently) and returns a staging subdirectory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn stage_dir(root: &Path, segments: &[&str]) -> Result<PathBuf> {
    let mut dir = root.to_path_buf();
    for segment in segments {
        dir.push(segment);
    }
    std::fs::create_dir_all(&dir).map_err(|e| Error::io("create_stage_dir", &e))?;
    Ok(dir)
}

/// Packs a staging tree into a zip archive at `target`.
///
/// Entries are written in sorted path order with forward-slash names, so the
/// same staging tree always produces the same entry sequence.
///
/// # Errors
///
/// Returns an error if the staging tree cannot be walked or the archive
/// cannot be written.
pub fn pack(staging_root: &Path, target: &Path) -> Result<()> {
    let file = File::create(target).map_err(|e| Error::io("create_archive", &e))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(staging_root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::OperationFailed {
            operation: "walk_staging_tree".to_string(),
            cause: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(staging_root)
            .map_err(|e| Error::OperationFailed {
                operation: "walk_staging_tree".to_string(),
                cause: e.to_string(),
            })?;
        let name = rel.to_string_lossy().replace('\\', "/");

        writer
            .start_file(name, options)
            .map_err(|e| Error::zip("write_archive_entry", &e))?;
        let mut source = File::open(entry.path()).map_err(|e| Error::io("read_staged_file", &e))?;
        io::copy(&mut source, &mut writer).map_err(|e| Error::io("write_archive_entry", &e))?;
    }

    writer
        .finish()
        .map_err(|e| Error::zip("finalize_archive", &e))?;
    Ok(())
}

/// An opened project archive with random access to its entries by normalized
/// name.
pub struct ProjectArchive {
    archive: ZipArchive<File>,
    /// `(normalized name, zip index)` in archive order; directories excluded.
    entries: Vec<(String, usize)>,
}

impl ProjectArchive {
    /// Opens an archive file and indexes its entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not a readable zip
    /// container.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io("open_archive", &e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| Error::zip("open_archive", &e))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| Error::zip("index_archive", &e))?;
            if entry.is_dir() {
                continue;
            }
            entries.push((normalize_entry_name(entry.name()).to_string(), index));
        }

        Ok(Self { archive, entries })
    }

    /// Returns all normalized entry names, in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the normalized names of all entries under `prefix`, in archive
    /// order.
    #[must_use]
    pub fn entries_under_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns true if the archive contains an entry with this normalized
    /// name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let name = normalize_entry_name(name);
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Reads the full content of the entry with this (normalized or raw)
    /// name.
    ///
    /// # Errors
    ///
    /// Returns an error if no such entry exists or the entry cannot be
    /// decompressed.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let name = normalize_entry_name(name);
        let index = self
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, index)| *index)
            .ok_or_else(|| Error::InvalidInput(format!("no archive entry named '{name}'")))?;

        let mut entry = self
            .archive
            .by_index(index)
            .map_err(|e| Error::zip("read_archive_entry", &e))?;
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| Error::io("read_archive_entry", &e))?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_case::test_case;

    #[test_case("/curation_ser/doc1/anno.ser", "curation_ser/doc1/anno.ser"; "legacy leading slash")]
    #[test_case("curation_ser/doc1/anno.ser", "curation_ser/doc1/anno.ser"; "current layout")]
    #[test_case("//weird", "/weird"; "only one slash stripped")]
    #[test_case("", ""; "empty name")]
    fn test_normalize_entry_name(raw: &str, expected: &str) {
        assert_eq!(normalize_entry_name(raw), expected);
    }

    #[test]
    fn test_stage_dir_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let a = stage_dir(root.path(), &["curation_ser", "doc1"]).unwrap();
        let b = stage_dir(root.path(), &["curation_ser", "doc1"]).unwrap();
        assert_eq!(a, b);
        assert!(a.is_dir());
    }

    #[test]
    fn test_pack_and_reopen_round_trip() {
        let staging = tempfile::tempdir().unwrap();
        let nested = stage_dir(staging.path(), &["source"]).unwrap();
        std::fs::write(nested.join("doc1.txt"), b"hello").unwrap();
        std::fs::write(staging.path().join("exportedproject.json"), b"{}").unwrap();

        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("project.zip");
        pack(staging.path(), &target).unwrap();

        let mut archive = ProjectArchive::open(&target).unwrap();
        assert!(archive.contains("source/doc1.txt"));
        assert!(archive.contains("exportedproject.json"));
        assert_eq!(archive.read("source/doc1.txt").unwrap(), b"hello");
    }

    #[test]
    fn test_legacy_leading_slash_entries_are_normalized() {
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("legacy.zip");

        let file = File::create(&target).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        writer
            .start_file("/curation_ser/doc1/anno.ser", options)
            .unwrap();
        writer.write_all(b"\x00\x01\x02").unwrap();
        writer.finish().unwrap();

        let mut archive = ProjectArchive::open(&target).unwrap();
        assert_eq!(
            archive.entries_under_prefix("curation_ser/"),
            vec!["curation_ser/doc1/anno.ser".to_string()]
        );
        // Reading by either spelling hits the same entry.
        assert_eq!(archive.read("curation_ser/doc1/anno.ser").unwrap(), b"\x00\x01\x02");
        assert_eq!(archive.read("/curation_ser/doc1/anno.ser").unwrap(), b"\x00\x01\x02");
    }
}
