use thiserror::Error;

/// Errors that can occur during nerflow core operations.
#[derive(Debug, Error)]
pub enum NerError {
    /// Filesystem failure while reading or writing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An artifact could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The labeled CSV dataset could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The dataset archive could not be extracted.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The sub-word tokenizer failed to load, save or encode.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Candle ML framework error.
    #[error("ML runtime error: {0}")]
    Candle(#[from] candle_core::Error),

    /// An object-storage transfer exited with a non-zero status.
    #[error("object storage transfer failed: `{command}` exited with {status}")]
    Sync {
        /// The transfer command that was run.
        command: String,
        /// Exit status description.
        status: String,
    },

    /// An object was requested from a bucket that does not hold it.
    #[error("object {object:?} not found in bucket {bucket:?}")]
    ObjectNotFound {
        /// Bucket name or root.
        bucket: String,
        /// Object name.
        object: String,
    },

    /// The dataset violates an expectation (missing columns, empty split, ...).
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// A model bundle is incomplete or inconsistent with the label vocabulary.
    #[error("invalid model bundle: {0}")]
    InvalidModel(String),

    /// The input sentence is empty or whitespace-only.
    #[error("input is empty or whitespace-only")]
    EmptyInput,
}

impl NerError {
    /// Wrap a `tokenizers` error, which is a boxed trait object.
    pub fn tokenizer(err: impl std::fmt::Display) -> Self {
        NerError::Tokenizer(err.to_string())
    }
}

/// Result type alias for nerflow operations.
pub type Result<T> = std::result::Result<T, NerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = NerError::EmptyInput;
        assert_eq!(err.to_string(), "input is empty or whitespace-only");

        let err = NerError::Sync {
            command: "gsutil cp a gs://b".into(),
            status: "exit status: 1".into(),
        };
        assert!(err.to_string().contains("gsutil cp a gs://b"));
        assert!(err.to_string().contains("exit status: 1"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: NerError = io.into();
        assert!(matches!(err, NerError::Io(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NerError>();
    }
}
