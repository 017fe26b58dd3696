//! # BERT Token Classifier
//!
//! A pretrained BERT backbone with a dropout + linear head producing one
//! logit row per sub-word position. Weights live in safetensors; the
//! backbone config is stored next to them as `config.json` with an extra
//! `num_labels` key.

use std::path::Path;

use candle_core::{D, DType, Device, Tensor};
use candle_core::safetensors::Load;
use candle_nn::{Dropout, Linear, Module, VarBuilder, VarMap};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use safetensors::SafeTensors;
use tracing::{debug, info, warn};

use crate::constants::{MODEL_CONFIG_FILE_NAME, MODEL_FILE_NAME, SENTINEL_LABEL};
use crate::encoding::{EncodedSentence, batch_tensors};
use crate::error::{NerError, Result};

/// Backbone config plus the size of the classification head.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    raw: serde_json::Value,
    bert: BertConfig,
    hidden_size: usize,
    hidden_dropout_prob: f32,
    num_labels: usize,
}

impl ModelConfig {
    /// Parse a backbone `config.json` and attach a head of `num_labels`.
    pub fn from_backbone_json(raw: serde_json::Value, num_labels: usize) -> Result<Self> {
        let bert: BertConfig = serde_json::from_value(raw.clone())?;
        let hidden_size = raw
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| NerError::InvalidModel("config.json has no hidden_size".into()))?
            as usize;
        let hidden_dropout_prob = raw
            .get("hidden_dropout_prob")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.1) as f32;

        let mut raw = raw;
        if let Some(obj) = raw.as_object_mut() {
            obj.insert("num_labels".into(), serde_json::Value::from(num_labels));
        }

        Ok(Self {
            raw,
            bert,
            hidden_size,
            hidden_dropout_prob,
            num_labels,
        })
    }

    /// Read a `config.json` written by [`ModelConfig::save`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let raw: serde_json::Value = serde_json::from_str(&content)?;
        let num_labels = raw
            .get("num_labels")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| NerError::InvalidModel("config.json has no num_labels".into()))?
            as usize;
        Self::from_backbone_json(raw, num_labels)
    }

    /// Read a pretrained backbone `config.json` and size the head.
    pub fn from_backbone_file<P: AsRef<Path>>(path: P, num_labels: usize) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_backbone_json(serde_json::from_str(&content)?, num_labels)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(&self.raw)?)?;
        Ok(())
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }
}

/// BERT backbone + token classification head.
pub struct TokenClassifier {
    bert: BertModel,
    dropout: Dropout,
    classifier: Linear,
    num_labels: usize,
    device: Device,
}

impl TokenClassifier {
    /// Build the model from a var builder rooted at the checkpoint.
    pub fn load(vb: VarBuilder, config: &ModelConfig) -> Result<Self> {
        let device = vb.device().clone();
        let bert = BertModel::load(vb.pp("bert"), &config.bert)?;
        let classifier = candle_nn::linear(config.hidden_size, config.num_labels, vb.pp("classifier"))?;

        Ok(Self {
            bert,
            dropout: Dropout::new(config.hidden_dropout_prob),
            classifier,
            num_labels: config.num_labels,
            device,
        })
    }

    /// Load a saved bundle directory (`model.safetensors` + `config.json`) for inference.
    pub fn from_bundle<P: AsRef<Path>>(dir: P, device: &Device) -> Result<Self> {
        let dir = dir.as_ref();
        let weights = dir.join(MODEL_FILE_NAME);
        if !weights.is_file() {
            return Err(NerError::InvalidModel(format!(
                "model weights not found at {}",
                weights.display()
            )));
        }
        let config = ModelConfig::from_file(dir.join(MODEL_CONFIG_FILE_NAME))?;

        // SAFETY: the weights file is opened read-only and is not modified
        // while the mapping is alive.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device)? };
        let model = Self::load(vb, &config)?;
        info!(dir = %dir.display(), num_labels = config.num_labels, "loaded model bundle");
        Ok(model)
    }

    /// Logits of shape `[batch, seq, num_labels]`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        type_ids: &Tensor,
        attention_mask: &Tensor,
        train: bool,
    ) -> Result<Tensor> {
        let hidden = self.bert.forward(input_ids, type_ids, Some(attention_mask))?;
        let hidden = self.dropout.forward(&hidden, train)?;
        Ok(self.classifier.forward(&hidden)?)
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

/// Anything that can assign a label id to every sub-word position.
pub trait TokenTagger {
    /// Argmax label id per position of `sentence`.
    fn tag_positions(&self, sentence: &EncodedSentence) -> Result<Vec<u32>>;
}

impl TokenTagger for TokenClassifier {
    fn tag_positions(&self, sentence: &EncodedSentence) -> Result<Vec<u32>> {
        let batch = batch_tensors(&[sentence], &self.device)?;
        let logits = self.forward(&batch.input_ids, &batch.type_ids, &batch.attention_mask, false)?;
        let predictions = logits.squeeze(0)?.argmax(D::Minus1)?;
        Ok(predictions.to_vec1::<u32>()?)
    }
}

/// A classifier whose weights live in a [`VarMap`] and can be optimised.
pub struct TrainableModel {
    pub varmap: VarMap,
    pub model: TokenClassifier,
    config: ModelConfig,
}

impl TrainableModel {
    /// Create a fresh model and copy every matching pretrained tensor into it.
    ///
    /// The classification head is never present in a backbone checkpoint and
    /// keeps its random initialisation.
    pub fn from_pretrained<P: AsRef<Path>>(
        weights: P,
        config: ModelConfig,
        device: &Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let model = TokenClassifier::load(vb, &config)?;
        load_matching(&varmap, weights.as_ref(), device)?;
        Ok(Self {
            varmap,
            model,
            config,
        })
    }

    /// Write `model.safetensors` and `config.json` into `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        self.varmap.save(dir.join(MODEL_FILE_NAME))?;
        self.config.save(dir.join(MODEL_CONFIG_FILE_NAME))?;
        info!(dir = %dir.display(), "saved model bundle");
        Ok(())
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

/// Copy tensors from a safetensors file into the variables of `varmap`.
///
/// Names are matched as-is and, for bare backbone checkpoints, with the
/// `bert.` prefix stripped. Returns the number of variables loaded.
fn load_matching(varmap: &VarMap, path: &Path, device: &Device) -> Result<usize> {
    let bytes = std::fs::read(path)?;
    let tensors = SafeTensors::deserialize(&bytes)
        .map_err(|e| NerError::InvalidModel(format!("{}: {e}", path.display())))?;

    let vars = varmap
        .data()
        .lock()
        .map_err(|e| NerError::InvalidModel(format!("variable map poisoned: {e}")))?;

    let mut loaded = 0usize;
    let mut missing = Vec::new();
    for (name, var) in vars.iter() {
        let view = tensors
            .tensor(name)
            .or_else(|_| tensors.tensor(name.strip_prefix("bert.").unwrap_or(name)));
        match view {
            Ok(view) if view.shape() != var.shape().dims() => {
                debug!(name = %name, "pretrained tensor shape differs, keeping initialisation");
                missing.push(name.clone());
            }
            Ok(view) => {
                let tensor = view.load(device)?.to_dtype(DType::F32)?;
                var.set(&tensor)?;
                loaded += 1;
            }
            Err(_) => missing.push(name.clone()),
        }
    }

    let backbone_missing: Vec<&String> = missing
        .iter()
        .filter(|name| !name.starts_with("classifier."))
        .collect();
    if loaded == 0 {
        return Err(NerError::InvalidModel(format!(
            "no pretrained tensors matched in {}",
            path.display()
        )));
    }
    if !backbone_missing.is_empty() {
        warn!(
            count = backbone_missing.len(),
            first = %backbone_missing[0],
            "backbone variables missing from pretrained checkpoint"
        );
    }
    debug!(loaded, missing = missing.len(), "loaded pretrained weights");
    Ok(loaded)
}

/// Cross entropy over the positions whose label is not the sentinel.
///
/// Returns `None` when the batch has no scored position.
pub fn masked_cross_entropy(logits: &Tensor, labels: &[i64]) -> Result<Option<Tensor>> {
    let num_labels = logits.dim(D::Minus1)?;
    let flat = logits.reshape(((), num_labels))?;

    let (keep, targets): (Vec<u32>, Vec<u32>) = labels
        .iter()
        .enumerate()
        .filter(|(_, label)| **label != SENTINEL_LABEL)
        .map(|(pos, &label)| (pos as u32, label as u32))
        .unzip();
    if keep.is_empty() {
        return Ok(None);
    }

    let device = logits.device();
    let scored_count = keep.len();
    let keep = Tensor::from_vec(keep, scored_count, device)?;
    let targets = Tensor::from_vec(targets, scored_count, device)?;
    let scored = flat.index_select(&keep, 0)?;
    Ok(Some(candle_nn::loss::cross_entropy(&scored, &targets)?))
}

/// Argmax label id per position of a `[batch, seq, num_labels]` logits tensor.
pub fn argmax_positions(logits: &Tensor) -> Result<Vec<Vec<u32>>> {
    Ok(logits.argmax(D::Minus1)?.to_vec2::<u32>()?)
}
