//! Outputs handed from one stage to the next.
//!
//! Artifacts only carry paths and scalars; the data itself stays on disk.
//! Each stage also writes its artifact as `artifact.json` in its directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use nerflow_core::store::write_json;

pub const ARTIFACT_FILE_NAME: &str = "artifact.json";

/// Persist `artifact` as `<dir>/artifact.json`.
pub fn record<T: Serialize>(dir: &Path, artifact: &T) -> nerflow_core::Result<PathBuf> {
    let path = dir.join(ARTIFACT_FILE_NAME);
    write_json(&path, artifact)?;
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    pub zip_path: PathBuf,
    pub csv_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    pub labels_to_ids_path: PathBuf,
    pub ids_to_labels_path: PathBuf,
    pub unique_labels_path: PathBuf,
    pub train_path: PathBuf,
    pub val_path: PathBuf,
    pub test_path: PathBuf,
    pub num_labels: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub model_dir: PathBuf,
    pub model_path: PathBuf,
    pub config_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluationArtifact {
    pub trained_model_accuracy: f64,
    /// `None` when no incumbent could be fetched or loaded.
    pub incumbent_model_accuracy: Option<f64>,
    pub is_model_accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPusherArtifact {
    pub bucket: String,
    /// Object names uploaded; empty when the model was rejected.
    pub pushed_objects: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nerflow_core::store::read_json;

    #[test]
    fn test_record_writes_artifact_json() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ModelEvaluationArtifact {
            trained_model_accuracy: 0.91,
            incumbent_model_accuracy: None,
            is_model_accepted: true,
        };

        let path = record(dir.path(), &artifact).unwrap();
        assert_eq!(path, dir.path().join(ARTIFACT_FILE_NAME));

        let back: ModelEvaluationArtifact = read_json(&path).unwrap();
        assert_eq!(back, artifact);
    }
}
