//! # nerflow Trainer
//!
//! The stages of the NER training pipeline and their orchestration. Each
//! stage reads the previous stage's artifact, writes its outputs under its
//! own directory and returns a new artifact:
//!
//! 1. [`ingestion`]: download and unpack the dataset archive.
//! 2. [`transformation`]: subset rows, build the label vocabulary, split.
//! 3. [`trainer`]: fine-tune the BERT token classifier.
//! 4. [`evaluation`]: score the new model against the incumbent.
//! 5. [`pusher`]: upload the model when it was accepted.

pub mod artifacts;
pub mod config;
pub mod evaluation;
pub mod ingestion;
pub mod pipeline;
pub mod pusher;
pub mod trainer;
pub mod transformation;

pub use config::{PipelineConfig, TrainingParams};
pub use pipeline::{PipelineOutcome, TrainingPipeline};
