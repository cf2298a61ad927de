//! ZIP payload extraction
//!
//! Regulator downloads arrive as in-memory ZIP payloads, never as files on
//! disk, so extraction works over a byte slice and yields each entry's
//! decompressed bytes paired with its output filename. Legacy `.bcp`
//! extensions are mapped to `.csv` here so downstream naming never sees
//! the bulk-export extension.

use std::io::{Cursor, Read};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// One decompressed archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Output filename: the entry's original name with a legacy `.bcp`
    /// extension mapped to `.csv`
    pub name: String,
    /// The entry's decompressed bytes
    pub data: Vec<u8>,
}

/// Extract every file entry from a ZIP payload
///
/// Directory entries are skipped. Fails with [`Error::Archive`] if the
/// payload cannot be parsed as a ZIP container.
pub fn extract(archive: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| Error::Archive(format!("not a valid ZIP container: {e}")))?;

    let mut entries = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut file = zip
            .by_index(i)
            .map_err(|e| Error::Archive(format!("failed to read ZIP entry {i}: {e}")))?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| Error::Archive(format!("failed to decompress `{}`: {e}", file.name())))?;
        let name = csv_name(file.name());
        debug!(entry = %name, bytes = data.len(), "extracted ZIP entry");
        entries.push(ArchiveEntry { name, data });
    }
    Ok(entries)
}

/// Extract a ZIP payload asserted to hold exactly one file entry
///
/// Used by the single-file regulator source, whose downstream logic
/// assumes exactly one payload. Any other entry count is a structural
/// violation and fails with [`Error::UnexpectedEntryCount`].
pub fn extract_single(archive: &[u8]) -> Result<ArchiveEntry> {
    let mut entries = extract(archive)?;
    match entries.len() {
        1 => Ok(entries.remove(0)),
        found => Err(Error::UnexpectedEntryCount { expected: 1, found }),
    }
}

/// Map a legacy `.bcp` filename to its `.csv` output name
fn csv_name(entry_name: &str) -> String {
    let path = Path::new(entry_name);
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("bcp") => {
            path.with_extension("csv").to_string_lossy().into_owned()
        }
        _ => entry_name.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    /// Build an in-memory ZIP with the given (name, bytes) entries
    fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_all_entries_with_names_and_bytes() {
        let archive = make_zip(&[
            ("extract_charity.bcp", b"a@**@b*@@*"),
            ("extract_main.bcp", b"c*@@*"),
        ]);
        let entries = extract(&archive).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "extract_charity.csv");
        assert_eq!(entries[0].data, b"a@**@b*@@*");
        assert_eq!(entries[1].name, "extract_main.csv");
    }

    #[test]
    fn non_bcp_extensions_are_left_alone() {
        let archive = make_zip(&[("register.csv", b"name,number\n")]);
        let entries = extract(&archive).unwrap();
        assert_eq!(entries[0].name, "register.csv");
    }

    #[test]
    fn bcp_extension_mapping_is_case_insensitive() {
        let archive = make_zip(&[("EXTRACT.BCP", b"x*@@*")]);
        let entries = extract(&archive).unwrap();
        assert_eq!(entries[0].name, "EXTRACT.csv");
    }

    #[test]
    fn single_entry_assertion_passes_on_one_entry() {
        let archive = make_zip(&[("oscr.csv", b"data")]);
        let entry = extract_single(&archive).unwrap();
        assert_eq!(entry.name, "oscr.csv");
        assert_eq!(entry.data, b"data");
    }

    #[test]
    fn single_entry_assertion_fails_on_two_entries() {
        let archive = make_zip(&[("a.csv", b"1"), ("b.csv", b"2")]);
        let err = extract_single(&archive).unwrap_err();
        match err {
            Error::UnexpectedEntryCount { expected, found } => {
                assert_eq!(expected, 1);
                assert_eq!(found, 2);
            }
            other => panic!("expected UnexpectedEntryCount, got {other:?}"),
        }
        assert!(err_is_fatal(&archive));
    }

    fn err_is_fatal(archive: &[u8]) -> bool {
        extract_single(archive).unwrap_err().is_fatal()
    }

    #[test]
    fn single_entry_assertion_fails_on_empty_archive() {
        let archive = make_zip(&[]);
        let err = extract_single(&archive).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedEntryCount {
                expected: 1,
                found: 0
            }
        ));
    }

    #[test]
    fn garbage_payload_is_an_archive_error() {
        let err = extract(b"this is not a zip file").unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
        assert!(!err.is_fatal());
    }
}
