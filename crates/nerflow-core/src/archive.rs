//! Zip extraction for the downloaded dataset archive.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Extract every entry of `archive` into `dest`, returning the extracted
/// file paths.
pub fn extract_all<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, dest: Q) -> Result<Vec<PathBuf>> {
    let dest = dest.as_ref();
    std::fs::create_dir_all(dest)?;

    let mut zip = zip::ZipArchive::new(File::open(archive.as_ref())?)?;
    let files: Vec<PathBuf> = (0..zip.len())
        .filter_map(|i| {
            let entry = zip.by_index(i).ok()?;
            if entry.is_dir() {
                return None;
            }
            entry.enclosed_name().map(|name| dest.join(name))
        })
        .collect();

    zip.extract(dest)?;
    tracing::info!(
        archive = %archive.as_ref().display(),
        dest = %dest.display(),
        entries = files.len(),
        "extracted archive"
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::error::NerError;

    fn make_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_all() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("archive.zip");
        make_zip(
            &zip_path,
            &[("ner.csv", "text,labels\nHi,O\n"), ("README", "dataset")],
        );

        let out = dir.path().join("DataIngestion");
        let files = extract_all(&zip_path, &out).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(
            std::fs::read_to_string(out.join("ner.csv")).unwrap(),
            "text,labels\nHi,O\n"
        );
    }

    #[test]
    fn test_extract_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("archive.zip");
        std::fs::write(&bogus, "not a zip").unwrap();
        let err = extract_all(&bogus, dir.path().join("out")).unwrap_err();
        assert!(matches!(err, NerError::Archive(_)));
    }
}
