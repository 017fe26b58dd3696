//! # Sentence Encoding
//!
//! Wraps a Hugging Face `tokenizers` tokenizer with fixed-length padding and
//! truncation, and attaches the sub-word alignment to every encoded sentence.

use std::path::Path;

use candle_core::{Device, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::alignment::{LabelPolicy, TokenRole, align_labels, token_roles};
use crate::dataset::NerRecord;
use crate::error::{NerError, Result};
use crate::labels::LabelVocab;

/// Token ids, masks and alignment of one sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSentence {
    pub input_ids: Vec<u32>,
    pub type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub roles: Vec<TokenRole>,
}

impl EncodedSentence {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// An encoded sentence with one label id (or sentinel) per position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSentence {
    pub encoded: EncodedSentence,
    pub labels: Vec<i64>,
}

/// Batch tensors of shape `[batch, seq]`.
pub struct BatchTensors {
    pub input_ids: Tensor,
    pub type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Tokenizer configured for fixed-length model inputs.
#[derive(Clone)]
pub struct SentenceEncoder {
    tokenizer: Tokenizer,
    max_length: usize,
}

impl SentenceEncoder {
    /// Configure `tokenizer` to pad and truncate to `max_length`.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        let pad_token = "[PAD]".to_string();
        let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            pad_id,
            pad_token,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(NerError::tokenizer)?;

        Ok(Self {
            tokenizer,
            max_length,
        })
    }

    /// Load a `tokenizer.json`.
    pub fn from_file<P: AsRef<Path>>(path: P, max_length: usize) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path.as_ref()).map_err(NerError::tokenizer)?;
        Self::new(tokenizer, max_length)
    }

    /// Write the tokenizer as `tokenizer.json`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.tokenizer
            .save(path.as_ref(), false)
            .map_err(NerError::tokenizer)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn encode(&self, text: &str) -> Result<EncodedSentence> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(NerError::tokenizer)?;

        Ok(EncodedSentence {
            input_ids: encoding.get_ids().to_vec(),
            type_ids: encoding.get_type_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
            roles: token_roles(encoding.get_word_ids()),
        })
    }

    /// Encode a record and align its word tags to sub-word positions.
    pub fn encode_labeled(
        &self,
        record: &NerRecord,
        vocab: &LabelVocab,
        policy: LabelPolicy,
    ) -> Result<LabeledSentence> {
        let encoded = self.encode(&record.text)?;
        let labels = align_labels(&encoded.roles, &record.tags(), vocab, policy);
        Ok(LabeledSentence { encoded, labels })
    }

    pub fn encode_all(
        &self,
        records: &[NerRecord],
        vocab: &LabelVocab,
        policy: LabelPolicy,
    ) -> Result<Vec<LabeledSentence>> {
        records
            .iter()
            .map(|r| self.encode_labeled(r, vocab, policy))
            .collect()
    }
}

/// Stack encoded sentences of equal length into `[batch, seq]` tensors.
pub fn batch_tensors(batch: &[&EncodedSentence], device: &Device) -> Result<BatchTensors> {
    let seq_len = batch.first().map(|s| s.len()).unwrap_or(0);
    if batch.iter().any(|s| s.len() != seq_len) {
        return Err(NerError::InvalidDataset(
            "sentences in a batch must share one padded length".into(),
        ));
    }

    let stack = |field: fn(&EncodedSentence) -> &[u32]| -> Result<Tensor> {
        let flat: Vec<u32> = batch.iter().flat_map(|s| field(s).iter().copied()).collect();
        Ok(Tensor::from_vec(flat, (batch.len(), seq_len), device)?)
    };

    Ok(BatchTensors {
        input_ids: stack(|s| s.input_ids.as_slice())?,
        type_ids: stack(|s| s.type_ids.as_slice())?,
        attention_mask: stack(|s| s.attention_mask.as_slice())?,
    })
}

/// Stack label rows into an `[batch, seq]` i64 tensor.
pub fn label_tensor(labels: &[&[i64]], device: &Device) -> Result<Tensor> {
    let seq_len = labels.first().map(|l| l.len()).unwrap_or(0);
    let flat: Vec<i64> = labels.iter().flat_map(|l| l.iter().copied()).collect();
    Ok(Tensor::from_vec(flat, (labels.len(), seq_len), device)?)
}


#[cfg(test)]
mod tests {
    use super::test_support::tiny_tokenizer;
    use super::*;
    use crate::constants::SENTINEL_LABEL;

    #[test]
    fn test_encode_pads_to_max_length() {
        let encoder = SentenceEncoder::new(tiny_tokenizer(), 8).unwrap();
        let encoded = encoder.encode("playing in london").unwrap();

        assert_eq!(encoded.input_ids, vec![2, 4, 5, 6, 7, 3, 0, 0]);
        assert_eq!(encoded.attention_mask, vec![1, 1, 1, 1, 1, 1, 0, 0]);
        assert_eq!(
            encoded.roles,
            vec![
                TokenRole::Special,
                TokenRole::WordStart(0),
                TokenRole::Continuation(0),
                TokenRole::WordStart(1),
                TokenRole::WordStart(2),
                TokenRole::Special,
                TokenRole::Special,
                TokenRole::Special,
            ]
        );
    }

    #[test]
    fn test_encode_truncates() {
        let encoder = SentenceEncoder::new(tiny_tokenizer(), 4).unwrap();
        let encoded = encoder.encode("playing in london").unwrap();
        assert_eq!(encoded.len(), 4);
        assert_eq!(encoded.input_ids.first(), Some(&2));
        assert_eq!(encoded.input_ids.last(), Some(&3));
    }

    #[test]
    fn test_encode_labeled() {
        let encoder = SentenceEncoder::new(tiny_tokenizer(), 8).unwrap();
        let vocab = LabelVocab::new(["O", "B-geo"]);
        let record = NerRecord::new("playing in london", "O O B-geo");

        let labeled = encoder
            .encode_labeled(&record, &vocab, LabelPolicy::default())
            .unwrap();
        let o = i64::from(vocab.id_of("O").unwrap());
        let geo = i64::from(vocab.id_of("B-geo").unwrap());
        assert_eq!(
            labeled.labels,
            vec![SENTINEL_LABEL, o, SENTINEL_LABEL, o, geo, SENTINEL_LABEL, SENTINEL_LABEL, SENTINEL_LABEL]
        );
    }

    #[test]
    fn test_batch_tensors_shape() {
        let encoder = SentenceEncoder::new(tiny_tokenizer(), 8).unwrap();
        let a = encoder.encode("playing in london").unwrap();
        let b = encoder.encode("bush spoke").unwrap();

        let tensors = batch_tensors(&[&a, &b], &Device::Cpu).unwrap();
        assert_eq!(tensors.input_ids.dims(), &[2, 8]);
        assert_eq!(tensors.attention_mask.dims(), &[2, 8]);

        let masked = [-100i64; 8];
        let zeros = [0i64; 8];
        let labels = label_tensor(&[&masked[..], &zeros[..]], &Device::Cpu).unwrap();
        assert_eq!(labels.dims(), &[2, 8]);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        let encoder = SentenceEncoder::new(tiny_tokenizer(), 8).unwrap();
        encoder.save(&path).unwrap();

        let reloaded = SentenceEncoder::from_file(&path, 8).unwrap();
        assert_eq!(
            reloaded.encode("bush spoke").unwrap(),
            encoder.encode("bush spoke").unwrap()
        );
    }
}
