//! # Object Storage Sync
//!
//! Per-file transfers between the local artifacts tree and a bucket. The
//! production store shells out to `gsutil cp`; [`LocalBucket`] mirrors the
//! same contract on a local directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::{NerError, Result};

/// A bucket that files can be copied to and from by object name.
pub trait ObjectStore {
    /// Bucket name (or root) for logging and artifacts.
    fn bucket(&self) -> &str;

    /// Copy `local` into the bucket as `object`.
    fn upload(&self, local: &Path, object: &str) -> Result<()>;

    /// Copy `object` from the bucket to `dest`.
    fn download(&self, object: &str, dest: &Path) -> Result<()>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    fn bucket(&self) -> &str {
        (**self).bucket()
    }

    fn upload(&self, local: &Path, object: &str) -> Result<()> {
        (**self).upload(local, object)
    }

    fn download(&self, object: &str, dest: &Path) -> Result<()> {
        (**self).download(object, dest)
    }
}

/// Google Cloud Storage via the `gsutil` command line tool.
#[derive(Debug, Clone)]
pub struct GsutilStore {
    bucket: String,
    program: String,
}

impl GsutilStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            program: "gsutil".to_string(),
        }
    }

    /// Use a different executable (a wrapper script, a pinned path).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn object_url(&self, object: &str) -> String {
        format!("gs://{}/{}", self.bucket, object)
    }

    fn copy(&self, from: &str, to: &str) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("cp").arg(from).arg(to);
        let rendered = format!("{} cp {} {}", self.program, from, to);

        let status = cmd.status()?;
        if !status.success() {
            return Err(NerError::Sync {
                command: rendered,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl ObjectStore for GsutilStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn upload(&self, local: &Path, object: &str) -> Result<()> {
        self.copy(&local.display().to_string(), &self.object_url(object))?;
        info!(bucket = %self.bucket, object, "uploaded to bucket");
        Ok(())
    }

    fn download(&self, object: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.copy(&self.object_url(object), &dest.display().to_string())?;
        info!(bucket = %self.bucket, object, dest = %dest.display(), "downloaded from bucket");
        Ok(())
    }
}

/// A bucket backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalBucket {
    root: PathBuf,
    name: String,
}

impl LocalBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root.display().to_string();
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectStore for LocalBucket {
    fn bucket(&self) -> &str {
        &self.name
    }

    fn upload(&self, local: &Path, object: &str) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::copy(local, self.root.join(object))?;
        info!(bucket = %self.name, object, "uploaded to local bucket");
        Ok(())
    }

    fn download(&self, object: &str, dest: &Path) -> Result<()> {
        let source = self.root.join(object);
        if !source.is_file() {
            return Err(NerError::ObjectNotFound {
                bucket: self.name.clone(),
                object: object.to_string(),
            });
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source, dest)?;
        info!(bucket = %self.name, object, dest = %dest.display(), "downloaded from local bucket");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_bucket_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = LocalBucket::new(dir.path().join("bucket"));

        let src = dir.path().join("model.safetensors");
        std::fs::write(&src, b"weights").unwrap();
        bucket.upload(&src, "model.safetensors").unwrap();

        let dest = dir.path().join("best_model").join("model.safetensors");
        bucket.download("model.safetensors", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"weights");
    }

    #[test]
    fn test_local_bucket_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = LocalBucket::new(dir.path());
        let err = bucket
            .download("model.safetensors", &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, NerError::ObjectNotFound { .. }));
    }

    #[test]
    fn test_boxed_store() {
        let dir = tempfile::tempdir().unwrap();
        let store: Box<dyn ObjectStore> = Box::new(LocalBucket::new(dir.path()));
        assert_eq!(store.bucket(), dir.path().display().to_string());
        assert!(store.download("missing", &dir.path().join("out")).is_err());
    }

    #[test]
    fn test_gsutil_object_url() {
        let store = GsutilStore::new("ner-using-bert-1");
        assert_eq!(store.object_url("archive.zip"), "gs://ner-using-bert-1/archive.zip");
        assert_eq!(store.bucket(), "ner-using-bert-1");
    }

    #[cfg(unix)]
    #[test]
    fn test_gsutil_nonzero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = GsutilStore::new("bucket").with_program("false");
        let err = store
            .download("archive.zip", &dir.path().join("archive.zip"))
            .unwrap_err();
        assert!(matches!(err, NerError::Sync { .. }));
    }

    #[test]
    fn test_gsutil_missing_program_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = GsutilStore::new("bucket").with_program("definitely-not-a-real-gsutil");
        let err = store
            .download("archive.zip", &dir.path().join("archive.zip"))
            .unwrap_err();
        assert!(matches!(err, NerError::Io(_)));
    }
}
