//! # nerflow
//!
//! Named-entity recognition on a pretrained BERT backbone: ingest a labeled
//! dataset from a bucket, fine-tune a token classifier, promote it when it
//! beats the current model, and tag sentences with the promoted model.
//!
//! This crate re-exports [`nerflow_core`] (data, alignment, model, metrics,
//! prediction) and [`nerflow_trainer`] (pipeline stages).

pub use nerflow_core;
pub use nerflow_trainer;

pub use nerflow_core::{
    GsutilStore, LabelVocab, LocalBucket, ModelPredictor, NerError, ObjectStore, Prediction,
    Predictor, Result,
};
pub use nerflow_trainer::{PipelineConfig, PipelineOutcome, TrainingParams, TrainingPipeline};
