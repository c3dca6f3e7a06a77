//! Archive reading: streaming entries out of a ZIP-formatted resource
//! archive, filtered by extension whitelist, optional book filter, and
//! per-file/per-resource caps.
//!
//! Seeded from the retrieval pack's other examples (the `zip` crate) since
//! the teacher never unzips anything; read in streaming mode per spec §9
//! ("Streaming vs. buffered unzip") via `ZipArchive::by_index` rather than
//! extracting to disk or buffering the whole archive in memory at once.

use std::io::{Cursor, Read};

use bytes::Bytes;
use tracing::debug;
use zip::ZipArchive;

use crate::types::ResourceKind;
use crate::{Error, Result};

/// One file read out of an archive.
#[derive(Debug, Clone)]
pub struct ReadEntry {
    /// Path within the archive.
    pub path: String,
    /// Lossily-decoded UTF-8 content.
    pub content: String,
}

/// Outcome of reading one archive: the entries that were materialized plus
/// the count of entries skipped for exceeding `max_bytes_per_file`.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    /// Entries successfully read within caps.
    pub entries: Vec<ReadEntry>,
    /// Entries dropped for exceeding the per-file byte cap.
    pub oversized_skipped: usize,
}

/// Read entries from `bytes`, keeping only files whose extension matches
/// `kind`'s whitelist and (if set) whose path contains `book_filter`.
/// Stops after `max_files` matching entries regardless of how many remain
/// in the archive.
///
/// # Errors
///
/// Returns [`Error::ArchiveCorrupt`] only when the archive's central
/// directory cannot be parsed at all; unreadable individual entries are
/// skipped, not raised as errors.
pub fn read_archive(
    bytes: &Bytes,
    kind: ResourceKind,
    book_filter: Option<&str>,
    max_files: usize,
    max_bytes_per_file: u64,
) -> Result<ReadOutcome> {
    let cursor = Cursor::new(bytes.as_ref());
    let mut archive =
        ZipArchive::new(cursor).map_err(|e| Error::ArchiveCorrupt(e.to_string()))?;

    let allowed = kind.allowed_extensions();
    let mut outcome = ReadOutcome::default();

    for index in 0..archive.len() {
        if outcome.entries.len() >= max_files {
            debug!(max_files, "archive reader hit max_files cap");
            break;
        }

        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(_) => continue,
        };

        if entry.is_dir() {
            continue;
        }

        let path = entry.name().to_string();
        if !has_allowed_extension(&path, allowed) {
            continue;
        }
        if let Some(filter) = book_filter {
            if !path.to_ascii_uppercase().contains(&filter.to_ascii_uppercase()) {
                continue;
            }
        }

        let size = entry.size();
        if size > max_bytes_per_file {
            outcome.oversized_skipped += 1;
            continue;
        }

        let mut buf = Vec::with_capacity(usize::try_from(size).unwrap_or(0).min(1 << 20));
        let mut limited = (&mut entry).take(max_bytes_per_file);
        if limited.read_to_end(&mut buf).is_err() {
            outcome.oversized_skipped += 1;
            continue;
        }
        if buf.len() as u64 > max_bytes_per_file {
            outcome.oversized_skipped += 1;
            continue;
        }

        let content = String::from_utf8_lossy(&buf).into_owned();
        outcome.entries.push(ReadEntry { path, content });
    }

    Ok(outcome)
}

fn has_allowed_extension(path: &str, allowed: &[&str]) -> bool {
    path.rsplit('.')
        .next()
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(files: &[(&str, &[u8])]) -> Bytes {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();
            for (name, content) in files {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content).unwrap();
            }
            writer.finish().unwrap();
        }
        Bytes::from(buf)
    }

    #[test]
    fn filters_by_extension() {
        let zip = build_zip(&[
            ("book/GEN.usfm", b"\\v 1 In the beginning"),
            ("README.md", b"not scripture"),
        ]);
        let outcome = read_archive(&zip, ResourceKind::Bible, None, 500, 1024 * 1024).unwrap();
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].path, "book/GEN.usfm");
    }

    #[test]
    fn applies_book_filter() {
        let zip = build_zip(&[
            ("book/GEN.usfm", b"genesis text"),
            ("book/JHN.usfm", b"john text"),
        ]);
        let outcome = read_archive(&zip, ResourceKind::Bible, Some("JHN"), 500, 1024 * 1024).unwrap();
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].path, "book/JHN.usfm");
    }

    #[test]
    fn enforces_max_files_cap() {
        let files: Vec<(String, Vec<u8>)> = (0..10)
            .map(|i| (format!("book/{i:02}.usfm"), b"x".to_vec()))
            .collect();
        let refs: Vec<(&str, &[u8])> = files.iter().map(|(n, c)| (n.as_str(), c.as_slice())).collect();
        let zip = build_zip(&refs);
        let outcome = read_archive(&zip, ResourceKind::Bible, None, 3, 1024 * 1024).unwrap();
        assert_eq!(outcome.entries.len(), 3);
    }

    #[test]
    fn oversized_entries_are_skipped_not_errored() {
        let zip = build_zip(&[("book/GEN.usfm", &[0u8; 100])]);
        let outcome = read_archive(&zip, ResourceKind::Bible, None, 500, 10).unwrap();
        assert_eq!(outcome.entries.len(), 0);
        assert_eq!(outcome.oversized_skipped, 1);
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let bytes = Bytes::from_static(b"not a zip file at all");
        let result = read_archive(&bytes, ResourceKind::Bible, None, 500, 1024 * 1024);
        assert!(matches!(result, Err(Error::ArchiveCorrupt(_))));
    }

    #[test]
    fn invalid_utf8_is_lossily_decoded_not_an_error() {
        let zip = build_zip(&[("book/GEN.usfm", &[0xFF, 0xFE, b'h', b'i'])]);
        let outcome = read_archive(&zip, ResourceKind::Bible, None, 500, 1024 * 1024).unwrap();
        assert_eq!(outcome.entries.len(), 1);
        assert!(outcome.entries[0].content.contains("hi"));
    }
}
