//! Model evaluation: score the new model and the incumbent on the test split.

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::Device;
use tracing::{info, warn};

use nerflow_core::constants::{MODEL_CONFIG_FILE_NAME, MODEL_FILE_NAME};
use nerflow_core::store::read_json;
use nerflow_core::{
    LabelVocab, LabeledSentence, NerRecord, ObjectStore, SentenceEncoder, TokenClassifier,
    decide_promotion, evaluate, select_device,
};

use crate::artifacts::{
    DataTransformationArtifact, ModelEvaluationArtifact, ModelTrainerArtifact, record,
};
use crate::config::{ModelEvaluationConfig, TrainingParams};

pub struct ModelEvaluation<'a, S: ObjectStore + ?Sized> {
    config: ModelEvaluationConfig,
    params: TrainingParams,
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> ModelEvaluation<'a, S> {
    pub fn new(config: ModelEvaluationConfig, params: TrainingParams, store: &'a S) -> Self {
        Self {
            config,
            params,
            store,
        }
    }

    pub fn run(
        &self,
        transformation: &DataTransformationArtifact,
        trained: &ModelTrainerArtifact,
    ) -> Result<ModelEvaluationArtifact> {
        info!(dir = %self.config.dir.display(), "started model evaluation");
        std::fs::create_dir_all(&self.config.dir)
            .with_context(|| format!("creating {}", self.config.dir.display()))?;

        let test: Vec<NerRecord> = read_json(&transformation.test_path)?;
        let vocab = LabelVocab::from_ids_to_labels(&read_json(&transformation.ids_to_labels_path)?)?;
        let encoder = SentenceEncoder::from_file(&trained.tokenizer_path, self.config.max_length)?;
        let test = encoder.encode_all(&test, &vocab, self.params.label_policy())?;

        let device = select_device();
        let model = TokenClassifier::from_bundle(&trained.model_dir, &device)
            .context("loading trained model")?;
        let trained_accuracy = evaluate(&model, &test)?;
        info!(accuracy = trained_accuracy, "scored trained model");

        let incumbent_accuracy = self.score_incumbent(&test, &device);
        let is_model_accepted = decide_promotion(trained_accuracy, incumbent_accuracy);
        info!(
            trained = trained_accuracy,
            incumbent = incumbent_accuracy.unwrap_or(0.0),
            accepted = is_model_accepted,
            "promotion decision"
        );

        let artifact = ModelEvaluationArtifact {
            trained_model_accuracy: trained_accuracy,
            incumbent_model_accuracy: incumbent_accuracy,
            is_model_accepted,
        };
        record(&self.config.dir, &artifact)?;
        info!("model evaluation completed");
        Ok(artifact)
    }

    /// Accuracy of the bucket's current model, `None` when there is none to score.
    fn score_incumbent(&self, test: &[LabeledSentence], device: &Device) -> Option<f64> {
        let dir = &self.config.incumbent_dir;
        if let Err(e) = self.fetch_incumbent(dir) {
            warn!(bucket = %self.store.bucket(), error = %e, "no incumbent model, baseline is 0");
            return None;
        }

        let model = match TokenClassifier::from_bundle(dir, device) {
            Ok(model) => model,
            Err(e) => {
                warn!(error = %e, "incumbent model could not be loaded, baseline is 0");
                return None;
            }
        };

        match evaluate(&model, test) {
            Ok(accuracy) => {
                info!(accuracy, "scored incumbent model");
                Some(accuracy)
            }
            Err(e) => {
                warn!(error = %e, "incumbent model could not be scored, baseline is 0");
                None
            }
        }
    }

    fn fetch_incumbent(&self, dir: &Path) -> nerflow_core::Result<()> {
        for object in [MODEL_FILE_NAME, MODEL_CONFIG_FILE_NAME] {
            self.store.download(object, &dir.join(object))?;
        }
        Ok(())
    }
}
