//! # nerflow Core
//!
//! Building blocks of the nerflow named-entity recognition pipeline: dataset
//! handling, label vocabulary, sub-word label alignment, a BERT token
//! classifier built on candle, accuracy evaluation and single-sentence
//! prediction.
//!
//! ## Quick Start
//!
//! ```rust
//! use nerflow_core::{LabelPolicy, LabelVocab, SENTINEL_LABEL, align_labels, token_roles};
//!
//! let vocab = LabelVocab::new(["O", "B-geo"]);
//! // [CLS] play ##ing in london [SEP]
//! let roles = token_roles(&[None, Some(0), Some(0), Some(1), Some(2), None]);
//! let tags: Vec<String> = ["O", "O", "B-geo"].iter().map(|t| t.to_string()).collect();
//!
//! let labels = align_labels(&roles, &tags, &vocab, LabelPolicy::default());
//! assert_eq!(labels[0], SENTINEL_LABEL);
//! assert_eq!(labels[2], SENTINEL_LABEL);
//! assert_eq!(labels[4], i64::from(vocab.id_of("B-geo").unwrap()));
//! ```
pub mod alignment;
pub mod archive;
pub mod cloud;
pub mod constants;
pub mod dataset;
pub mod device;
pub mod encoding;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod model;
pub mod predictor;
pub mod store;

// Re-export primary API
pub use alignment::{LabelPolicy, TokenRole, align_labels, scored_positions, token_roles};
pub use cloud::{GsutilStore, LocalBucket, ObjectStore};
pub use constants::SENTINEL_LABEL;
pub use dataset::{DatasetSplit, NerRecord};
pub use device::select_device;
pub use encoding::{EncodedSentence, LabeledSentence, SentenceEncoder};
pub use error::{NerError, Result};
pub use labels::LabelVocab;
pub use metrics::{decide_promotion, evaluate};
pub use model::{ModelConfig, TokenClassifier, TokenTagger, TrainableModel};
pub use predictor::{ModelPredictor, Prediction, Predictor};
