//! Model pusher: upload an accepted bundle to the bucket.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use nerflow_core::ObjectStore;
use nerflow_core::constants::{
    IDS_TO_LABELS_FILE_NAME, MODEL_CONFIG_FILE_NAME, MODEL_FILE_NAME, TOKENIZER_FILE_NAME,
};

use crate::artifacts::{
    DataTransformationArtifact, ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact,
    record,
};
use crate::config::ModelPusherConfig;

pub struct ModelPusher<'a, S: ObjectStore + ?Sized> {
    config: ModelPusherConfig,
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> ModelPusher<'a, S> {
    pub fn new(config: ModelPusherConfig, store: &'a S) -> Self {
        Self { config, store }
    }

    pub fn run(
        &self,
        transformation: &DataTransformationArtifact,
        trained: &ModelTrainerArtifact,
        evaluation: &ModelEvaluationArtifact,
    ) -> Result<ModelPusherArtifact> {
        info!(dir = %self.config.dir.display(), "started model pusher");
        std::fs::create_dir_all(&self.config.dir)
            .with_context(|| format!("creating {}", self.config.dir.display()))?;

        let mut pushed_objects = Vec::new();
        if evaluation.is_model_accepted {
            let bundle: [(&PathBuf, &str); 4] = [
                (&trained.model_path, MODEL_FILE_NAME),
                (&trained.config_path, MODEL_CONFIG_FILE_NAME),
                (&trained.tokenizer_path, TOKENIZER_FILE_NAME),
                (&transformation.ids_to_labels_path, IDS_TO_LABELS_FILE_NAME),
            ];
            for (local, object) in bundle {
                self.store
                    .upload(local, object)
                    .with_context(|| format!("uploading {object} to {}", self.config.bucket))?;
                pushed_objects.push(object.to_string());
            }
            info!(bucket = %self.config.bucket, "pushed accepted model");
        } else {
            info!(
                trained = evaluation.trained_model_accuracy,
                incumbent = evaluation.incumbent_model_accuracy.unwrap_or(0.0),
                "model not accepted, nothing pushed"
            );
        }

        let artifact = ModelPusherArtifact {
            bucket: self.config.bucket.clone(),
            pushed_objects,
        };
        record(&self.config.dir, &artifact)?;
        info!("model pusher completed");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use nerflow_core::LocalBucket;

    fn bundle(dir: &std::path::Path) -> (DataTransformationArtifact, ModelTrainerArtifact) {
        let file = |name: &str| {
            let path = dir.join(name);
            std::fs::write(&path, name).unwrap();
            path
        };
        let transformation = DataTransformationArtifact {
            labels_to_ids_path: file("labels_to_ids.json"),
            ids_to_labels_path: file(IDS_TO_LABELS_FILE_NAME),
            unique_labels_path: file("unique_labels.json"),
            train_path: file("df_train.json"),
            val_path: file("df_val.json"),
            test_path: file("df_test.json"),
            num_labels: 1,
        };
        let trained = ModelTrainerArtifact {
            model_dir: dir.to_path_buf(),
            model_path: file(MODEL_FILE_NAME),
            config_path: file(MODEL_CONFIG_FILE_NAME),
            tokenizer_path: file(TOKENIZER_FILE_NAME),
            train_loss: 0.1,
            train_accuracy: 0.9,
            val_loss: 0.2,
            val_accuracy: 0.8,
        };
        (transformation, trained)
    }

    fn evaluation(accepted: bool) -> ModelEvaluationArtifact {
        ModelEvaluationArtifact {
            trained_model_accuracy: 0.91,
            incumbent_model_accuracy: Some(0.90),
            is_model_accepted: accepted,
        }
    }

    #[test]
    fn test_accepted_model_is_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let (transformation, trained) = bundle(dir.path());
        let bucket = dir.path().join("bucket");
        let store = LocalBucket::new(&bucket);
        let config = PipelineConfig::default().with_artifacts_dir(dir.path().join("run"));

        let artifact = ModelPusher::new(config.model_pusher(), &store)
            .run(&transformation, &trained, &evaluation(true))
            .unwrap();

        assert_eq!(artifact.pushed_objects.len(), 4);
        for object in &artifact.pushed_objects {
            assert_eq!(
                std::fs::read_to_string(bucket.join(object)).unwrap(),
                *object
            );
        }
    }

    #[test]
    fn test_rejected_model_is_not_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let (transformation, trained) = bundle(dir.path());
        let bucket = dir.path().join("bucket");
        let store = LocalBucket::new(&bucket);
        let config = PipelineConfig::default().with_artifacts_dir(dir.path().join("run"));

        let artifact = ModelPusher::new(config.model_pusher(), &store)
            .run(&transformation, &trained, &evaluation(false))
            .unwrap();

        assert!(artifact.pushed_objects.is_empty());
        assert!(!bucket.join(MODEL_FILE_NAME).exists());
    }
}
