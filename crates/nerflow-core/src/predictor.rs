//! # Sentence Prediction
//!
//! Tags a single sentence with the promoted model. The bundle (weights,
//! config, tokenizer, id → label map) is fetched from the bucket into a
//! local `best_model` directory first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use candle_core::Device;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alignment::scored_positions;
use crate::cloud::ObjectStore;
use crate::constants::{
    BEST_MODEL_DIR, IDS_TO_LABELS_FILE_NAME, MAX_SEQ_LEN, MODEL_CONFIG_FILE_NAME, MODEL_FILE_NAME,
    TOKENIZER_FILE_NAME,
};
use crate::encoding::SentenceEncoder;
use crate::error::{NerError, Result};
use crate::labels::LabelVocab;
use crate::model::{TokenClassifier, TokenTagger};
use crate::store::read_json;

/// Tags predicted for one sentence, one per word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub sentence: String,
    pub labels: Vec<String>,
}

/// A loaded model bundle ready to tag sentences.
pub struct Predictor {
    encoder: SentenceEncoder,
    vocab: LabelVocab,
    tagger: Box<dyn TokenTagger>,
}

impl Predictor {
    pub fn new(encoder: SentenceEncoder, vocab: LabelVocab, tagger: Box<dyn TokenTagger>) -> Self {
        Self {
            encoder,
            vocab,
            tagger,
        }
    }

    /// Load tokenizer, label map and model from a bundle directory.
    pub fn from_dir<P: AsRef<Path>>(dir: P, max_length: usize, device: &Device) -> Result<Self> {
        let dir = dir.as_ref();
        let encoder = SentenceEncoder::from_file(dir.join(TOKENIZER_FILE_NAME), max_length)?;
        let ids_to_labels: BTreeMap<u32, String> = read_json(dir.join(IDS_TO_LABELS_FILE_NAME))?;
        let vocab = LabelVocab::from_ids_to_labels(&ids_to_labels)?;

        let model = TokenClassifier::from_bundle(dir, device)?;
        if model.num_labels() != vocab.len() {
            return Err(NerError::InvalidModel(format!(
                "model has {} labels but the label map has {}",
                model.num_labels(),
                vocab.len()
            )));
        }

        Ok(Self::new(encoder, vocab, Box::new(model)))
    }

    /// Tag each word of `sentence` with the label of its first sub-word.
    pub fn predict(&self, sentence: &str) -> Result<Prediction> {
        if sentence.trim().is_empty() {
            return Err(NerError::EmptyInput);
        }

        let encoded = self.encoder.encode(sentence)?;
        let ids = self.tagger.tag_positions(&encoded)?;

        let labels = scored_positions(&encoded.roles)
            .into_iter()
            .map(|pos| {
                let id = ids.get(pos).copied().ok_or_else(|| {
                    NerError::InvalidModel(format!("no prediction for position {pos}"))
                })?;
                self.vocab
                    .label_of(id)
                    .map(str::to_string)
                    .ok_or_else(|| NerError::InvalidModel(format!("predicted unknown label id {id}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Prediction {
            sentence: sentence.to_string(),
            labels,
        })
    }
}

/// Fetches the promoted bundle from a bucket and serves predictions.
pub struct ModelPredictor<S: ObjectStore> {
    store: S,
    best_model_dir: PathBuf,
    max_length: usize,
}

impl<S: ObjectStore> ModelPredictor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            best_model_dir: PathBuf::from(BEST_MODEL_DIR),
            max_length: MAX_SEQ_LEN,
        }
    }

    pub fn with_best_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.best_model_dir = dir.into();
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Download every bundle file into the best-model directory.
    pub fn fetch_bundle(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.best_model_dir)?;
        info!(dir = %self.best_model_dir.display(), "created best model directory");

        for object in [
            TOKENIZER_FILE_NAME,
            IDS_TO_LABELS_FILE_NAME,
            MODEL_CONFIG_FILE_NAME,
            MODEL_FILE_NAME,
        ] {
            self.store
                .download(object, &self.best_model_dir.join(object))?;
        }
        Ok(&self.best_model_dir)
    }

    /// Download the bundle and load a [`Predictor`].
    pub fn load(&self, device: &Device) -> Result<Predictor> {
        let dir = self.fetch_bundle()?;
        let predictor = Predictor::from_dir(dir, self.max_length, device)?;
        info!("best model loaded for prediction");
        Ok(predictor)
    }

    /// Download, load and tag one sentence.
    pub fn predict(&self, sentence: &str, device: &Device) -> Result<Prediction> {
        info!("started model prediction");
        let prediction = self.load(device)?.predict(sentence)?;
        info!(words = prediction.labels.len(), "model prediction completed");
        Ok(prediction)
    }
}
