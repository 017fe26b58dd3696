//! Fine-tuning loop for the token classifier.

use anyhow::{Context, Result};
use candle_nn::{Optimizer, SGD};
use tracing::{debug, info};

use nerflow_core::encoding::batch_tensors;
use nerflow_core::metrics::AccuracyAccumulator;
use nerflow_core::model::{argmax_positions, masked_cross_entropy};
use nerflow_core::store::read_json;
use nerflow_core::{
    EncodedSentence, LabelVocab, LabeledSentence, ModelConfig, NerRecord, SentenceEncoder,
    TokenClassifier, TrainableModel, select_device,
};

use crate::artifacts::{DataTransformationArtifact, ModelTrainerArtifact, record};
use crate::config::ModelTrainerConfig;

/// Mean loss per scored batch and accuracy over one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochStats {
    pub loss: f64,
    pub accuracy: f64,
}

pub struct ModelTrainer {
    config: ModelTrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, transformation: &DataTransformationArtifact) -> Result<ModelTrainerArtifact> {
        info!(dir = %self.config.dir.display(), "started model training");
        let params = &self.config.params;

        let train: Vec<NerRecord> = read_json(&transformation.train_path)?;
        let val: Vec<NerRecord> = read_json(&transformation.val_path)?;
        let vocab = LabelVocab::from_ids_to_labels(&read_json(&transformation.ids_to_labels_path)?)?;

        let encoder = SentenceEncoder::from_file(self.config.pretrained_tokenizer(), params.max_length)
            .with_context(|| format!("loading tokenizer from {}", self.config.pretrained_dir.display()))?;
        let policy = params.label_policy();
        let train = encoder.encode_all(&train, &vocab, policy)?;
        let val = encoder.encode_all(&val, &vocab, policy)?;

        let device = select_device();
        let model_config = ModelConfig::from_backbone_file(self.config.pretrained_config(), vocab.len())?;
        let trainable =
            TrainableModel::from_pretrained(self.config.pretrained_weights(), model_config, &device)
                .with_context(|| {
                    format!("loading pretrained model from {}", self.config.pretrained_dir.display())
                })?;

        let mut optimizer = SGD::new(trainable.varmap.all_vars(), params.learning_rate)?;
        let mut train_stats = EpochStats::default();
        let mut val_stats = EpochStats::default();

        for epoch in 0..params.epochs {
            let order = shuffled(train.len(), params.seed.wrapping_add(epoch as u64));
            train_stats = run_epoch(
                &trainable.model,
                &train,
                &order,
                params.batch_size,
                Some(&mut optimizer),
            )?;

            let order: Vec<usize> = (0..val.len()).collect();
            val_stats = run_epoch(&trainable.model, &val, &order, params.batch_size, None)?;

            info!(
                epoch = epoch + 1,
                train_loss = train_stats.loss,
                train_accuracy = train_stats.accuracy,
                val_loss = val_stats.loss,
                val_accuracy = val_stats.accuracy,
                "epoch complete"
            );
        }

        trainable.save(&self.config.dir)?;
        encoder.save(&self.config.tokenizer_path)?;

        let artifact = ModelTrainerArtifact {
            model_dir: self.config.dir.clone(),
            model_path: self.config.model_path.clone(),
            config_path: self.config.config_path.clone(),
            tokenizer_path: self.config.tokenizer_path.clone(),
            train_loss: train_stats.loss,
            train_accuracy: train_stats.accuracy,
            val_loss: val_stats.loss,
            val_accuracy: val_stats.accuracy,
        };
        record(&self.config.dir, &artifact)?;
        info!(model = %artifact.model_path.display(), "model training completed");
        Ok(artifact)
    }
}

/// Seeded Fisher-Yates permutation of `0..n`.
fn shuffled(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = oorandom::Rand64::new(u128::from(seed));
    for i in (1..n).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        indices.swap(i, j);
    }
    indices
}

/// One pass over `examples` in `order`. Weights are updated only when an
/// optimizer is given; dropout is active only then as well.
pub fn run_epoch(
    model: &TokenClassifier,
    examples: &[LabeledSentence],
    order: &[usize],
    batch_size: usize,
    mut optimizer: Option<&mut SGD>,
) -> Result<EpochStats> {
    let train = optimizer.is_some();
    let mut accuracy = AccuracyAccumulator::new();
    let mut total_loss = 0.0;
    let mut scored_batches = 0usize;

    for (step, chunk) in order.chunks(batch_size.max(1)).enumerate() {
        let encoded: Vec<&EncodedSentence> = chunk.iter().map(|&i| &examples[i].encoded).collect();
        let labels: Vec<i64> = chunk
            .iter()
            .flat_map(|&i| examples[i].labels.iter().copied())
            .collect();

        let batch = batch_tensors(&encoded, model.device())?;
        let logits = model.forward(&batch.input_ids, &batch.type_ids, &batch.attention_mask, train)?;

        if let Some(loss) = masked_cross_entropy(&logits, &labels)? {
            if let Some(optimizer) = optimizer.as_deref_mut() {
                optimizer.backward_step(&loss)?;
            }
            let value = f64::from(loss.to_scalar::<f32>()?);
            debug!(step, loss = value, train, "batch");
            total_loss += value;
            scored_batches += 1;
        }

        for (predictions, &i) in argmax_positions(&logits)?.iter().zip(chunk) {
            accuracy.add_example(predictions, &examples[i].labels);
        }
    }

    Ok(EpochStats {
        loss: if scored_batches == 0 {
            0.0
        } else {
            total_loss / scored_batches as f64
        },
        accuracy: accuracy.accuracy(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, TrainingParams};
    use crate::test_support::{sample_rows, transformed, write_pretrained};

    #[test]
    fn test_shuffled_is_a_permutation() {
        let mut order = shuffled(50, 7);
        assert_eq!(order, shuffled(50, 7));
        assert_ne!(order, shuffled(50, 8));
        order.sort_unstable();
        assert_eq!(order, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_training_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let pretrained = dir.path().join("pretrained");
        write_pretrained(&pretrained);

        let params = TrainingParams {
            max_length: 16,
            max_rows: 10,
            ..Default::default()
        };
        let config = PipelineConfig::default()
            .with_artifacts_dir(dir.path().join("run"))
            .with_pretrained_dir(&pretrained)
            .with_params(params);
        let transformation = transformed(&config, &sample_rows(10));

        let artifact = ModelTrainer::new(config.model_trainer())
            .run(&transformation)
            .unwrap();

        assert!(artifact.model_path.is_file());
        assert!(artifact.config_path.is_file());
        assert!(artifact.tokenizer_path.is_file());
        assert!((0.0..=1.0).contains(&artifact.train_accuracy));
        assert!((0.0..=1.0).contains(&artifact.val_accuracy));
        assert!(artifact.train_loss.is_finite());

        let model = TokenClassifier::from_bundle(&artifact.model_dir, &candle_core::Device::Cpu)
            .unwrap();
        assert_eq!(model.num_labels(), transformation.num_labels);
    }

    #[test]
    fn test_training_without_pretrained_weights_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default()
            .with_artifacts_dir(dir.path().join("run"))
            .with_pretrained_dir(dir.path().join("missing"));
        let transformation = transformed(&config, &sample_rows(10));

        let err = ModelTrainer::new(config.model_trainer())
            .run(&transformation)
            .unwrap_err();
        assert!(err.to_string().contains("loading tokenizer"));
    }
}
