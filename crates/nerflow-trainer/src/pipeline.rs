//! The training pipeline: ingestion, transformation, training, evaluation
//! and pushing, run strictly in that order.

use anyhow::{Context, Result};
use tracing::info;

use nerflow_core::ObjectStore;

use crate::artifacts::{ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact};
use crate::config::PipelineConfig;
use crate::evaluation::ModelEvaluation;
use crate::ingestion::DataIngestion;
use crate::pusher::ModelPusher;
use crate::trainer::ModelTrainer;
use crate::transformation::DataTransformation;

/// Final artifacts of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub trainer: ModelTrainerArtifact,
    pub evaluation: ModelEvaluationArtifact,
    pub pusher: ModelPusherArtifact,
}

pub struct TrainingPipeline<S: ObjectStore> {
    config: PipelineConfig,
    store: S,
}

impl<S: ObjectStore> TrainingPipeline<S> {
    pub fn new(config: PipelineConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<PipelineOutcome> {
        info!(
            artifacts = %self.config.artifacts_dir.display(),
            bucket = %self.store.bucket(),
            "starting training pipeline"
        );

        let ingestion = DataIngestion::new(self.config.data_ingestion(), &self.store)
            .run()
            .context("data ingestion failed")?;

        let transformation = DataTransformation::new(self.config.data_transformation())
            .run(&ingestion)
            .context("data transformation failed")?;

        let trainer = ModelTrainer::new(self.config.model_trainer())
            .run(&transformation)
            .context("model training failed")?;

        let evaluation = ModelEvaluation::new(
            self.config.model_evaluation(),
            self.config.params.clone(),
            &self.store,
        )
        .run(&transformation, &trainer)
        .context("model evaluation failed")?;

        let pusher = ModelPusher::new(self.config.model_pusher(), &self.store)
            .run(&transformation, &trainer, &evaluation)
            .context("model pushing failed")?;

        info!(
            accepted = evaluation.is_model_accepted,
            pushed = pusher.pushed_objects.len(),
            "training pipeline completed"
        );
        Ok(PipelineOutcome {
            trainer,
            evaluation,
            pusher,
        })
    }
}
