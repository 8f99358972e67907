//! Extraction of single members from zip archives.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::FetchError;

/// Extract `member` from the zip at `archive` into `dest_dir`.
///
/// Returns the path of the extracted file.
pub fn extract_member(archive: &Path, member: &str, dest_dir: &Path) -> Result<PathBuf, FetchError> {
    let archive_error = |message: String| FetchError::Archive {
        path: archive.to_path_buf(),
        message,
    };

    let file = File::open(archive).map_err(|e| FetchError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;
    let mut entry = zip
        .by_name(member)
        .map_err(|e| archive_error(format!("{member}: {e}")))?;

    let out_path = dest_dir.join(member);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
    }
    let mut out = File::create(&out_path).map_err(|e| FetchError::io(&out_path, e))?;
    std::io::copy(&mut entry, &mut out).map_err(|e| FetchError::io(&out_path, e))?;

    debug!(?archive, member, "extracted archive member");
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in members {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_requested_member() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("gtfs.zip");
        write_zip(
            &archive,
            &[("agency.txt", "agency_id\n1\n"), ("stops.txt", "stop_id\n0253\n")],
        );

        let out = extract_member(&archive, "stops.txt", dir.path()).unwrap();
        assert_eq!(out, dir.path().join("stops.txt"));
        assert_eq!(std::fs::read_to_string(out).unwrap(), "stop_id\n0253\n");
    }

    #[test]
    fn missing_member_is_an_error() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("gtfs.zip");
        write_zip(&archive, &[("agency.txt", "agency_id\n")]);

        let result = extract_member(&archive, "stops.txt", dir.path());
        assert!(matches!(result, Err(FetchError::Archive { .. })));
    }

    #[test]
    fn missing_archive_is_an_error() {
        let dir = tempdir().unwrap();
        let result = extract_member(&dir.path().join("none.zip"), "stops.txt", dir.path());
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }
}
