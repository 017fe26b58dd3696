//! Pipeline and per-stage configuration.
//!
//! Every stage writes into its own directory under a timestamped artifacts
//! root, so consecutive runs never overwrite each other.

use std::path::{Path, PathBuf};

use nerflow_core::constants::{
    ARTIFACTS_DIR, BATCH_SIZE, BEST_MODEL_DIR, BUCKET_NAME, CSV_DATA_FILE_NAME, DATA_FILE_NAME,
    DATA_INGESTION_ARTIFACTS_DIR, DATA_TRANSFORMATION_ARTIFACTS_DIR, DF_TEST_FILE_NAME,
    DF_TRAIN_FILE_NAME, DF_VAL_FILE_NAME, EPOCHS, IDS_TO_LABELS_FILE_NAME, LEARNING_RATE,
    LABELS_TO_IDS_FILE_NAME, MAX_ROWS, MAX_SEQ_LEN, MODEL_CONFIG_FILE_NAME,
    MODEL_EVALUATION_ARTIFACTS_DIR, MODEL_FILE_NAME, MODEL_PUSHER_ARTIFACTS_DIR,
    MODEL_TRAINING_ARTIFACTS_DIR, PRETRAINED_DIR, SPLIT_SEED, TOKENIZER_FILE_NAME,
    UNIQUE_LABELS_FILE_NAME,
};
use nerflow_core::LabelPolicy;

/// Format of the per-run artifacts directory name.
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Optimisation and data hyper-parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub max_length: usize,
    pub max_rows: usize,
    pub seed: u64,
    pub label_all_tokens: bool,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            learning_rate: LEARNING_RATE,
            epochs: EPOCHS,
            batch_size: BATCH_SIZE,
            max_length: MAX_SEQ_LEN,
            max_rows: MAX_ROWS,
            seed: SPLIT_SEED,
            label_all_tokens: false,
        }
    }
}

impl TrainingParams {
    pub fn label_policy(&self) -> LabelPolicy {
        LabelPolicy {
            label_all_tokens: self.label_all_tokens,
        }
    }
}

/// Top-level configuration of one training run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub artifacts_dir: PathBuf,
    pub bucket: String,
    pub data_object: String,
    pub pretrained_dir: PathBuf,
    pub params: TrainingParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self {
            artifacts_dir: Path::new(ARTIFACTS_DIR).join(timestamp),
            bucket: BUCKET_NAME.to_string(),
            data_object: DATA_FILE_NAME.to_string(),
            pretrained_dir: PathBuf::from(PRETRAINED_DIR),
            params: TrainingParams::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_data_object(mut self, object: impl Into<String>) -> Self {
        self.data_object = object.into();
        self
    }

    pub fn with_pretrained_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pretrained_dir = dir.into();
        self
    }

    pub fn with_params(mut self, params: TrainingParams) -> Self {
        self.params = params;
        self
    }

    pub fn data_ingestion(&self) -> DataIngestionConfig {
        let dir = self.artifacts_dir.join(DATA_INGESTION_ARTIFACTS_DIR);
        DataIngestionConfig {
            zip_path: dir.join(DATA_FILE_NAME),
            csv_path: dir.join(CSV_DATA_FILE_NAME),
            data_object: self.data_object.clone(),
            dir,
        }
    }

    pub fn data_transformation(&self) -> DataTransformationConfig {
        let dir = self.artifacts_dir.join(DATA_TRANSFORMATION_ARTIFACTS_DIR);
        DataTransformationConfig {
            labels_to_ids_path: dir.join(LABELS_TO_IDS_FILE_NAME),
            ids_to_labels_path: dir.join(IDS_TO_LABELS_FILE_NAME),
            unique_labels_path: dir.join(UNIQUE_LABELS_FILE_NAME),
            train_path: dir.join(DF_TRAIN_FILE_NAME),
            val_path: dir.join(DF_VAL_FILE_NAME),
            test_path: dir.join(DF_TEST_FILE_NAME),
            max_rows: self.params.max_rows,
            seed: self.params.seed,
            dir,
        }
    }

    pub fn model_trainer(&self) -> ModelTrainerConfig {
        let dir = self.artifacts_dir.join(MODEL_TRAINING_ARTIFACTS_DIR);
        ModelTrainerConfig {
            model_path: dir.join(MODEL_FILE_NAME),
            config_path: dir.join(MODEL_CONFIG_FILE_NAME),
            tokenizer_path: dir.join(TOKENIZER_FILE_NAME),
            pretrained_dir: self.pretrained_dir.clone(),
            params: self.params.clone(),
            dir,
        }
    }

    pub fn model_evaluation(&self) -> ModelEvaluationConfig {
        let dir = self.artifacts_dir.join(MODEL_EVALUATION_ARTIFACTS_DIR);
        ModelEvaluationConfig {
            incumbent_dir: dir.join(BEST_MODEL_DIR),
            max_length: self.params.max_length,
            dir,
        }
    }

    pub fn model_pusher(&self) -> ModelPusherConfig {
        ModelPusherConfig {
            dir: self.artifacts_dir.join(MODEL_PUSHER_ARTIFACTS_DIR),
            bucket: self.bucket.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataIngestionConfig {
    pub dir: PathBuf,
    pub data_object: String,
    pub zip_path: PathBuf,
    pub csv_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DataTransformationConfig {
    pub dir: PathBuf,
    pub labels_to_ids_path: PathBuf,
    pub ids_to_labels_path: PathBuf,
    pub unique_labels_path: PathBuf,
    pub train_path: PathBuf,
    pub val_path: PathBuf,
    pub test_path: PathBuf,
    pub max_rows: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct ModelTrainerConfig {
    pub dir: PathBuf,
    pub model_path: PathBuf,
    pub config_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub pretrained_dir: PathBuf,
    pub params: TrainingParams,
}

impl ModelTrainerConfig {
    pub fn pretrained_weights(&self) -> PathBuf {
        self.pretrained_dir.join(MODEL_FILE_NAME)
    }

    pub fn pretrained_config(&self) -> PathBuf {
        self.pretrained_dir.join(MODEL_CONFIG_FILE_NAME)
    }

    pub fn pretrained_tokenizer(&self) -> PathBuf {
        self.pretrained_dir.join(TOKENIZER_FILE_NAME)
    }
}

#[derive(Debug, Clone)]
pub struct ModelEvaluationConfig {
    pub dir: PathBuf,
    /// Where the incumbent bundle is downloaded.
    pub incumbent_dir: PathBuf,
    pub max_length: usize,
}

#[derive(Debug, Clone)]
pub struct ModelPusherConfig {
    pub dir: PathBuf,
    pub bucket: String,
}
