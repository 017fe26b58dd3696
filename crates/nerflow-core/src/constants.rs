//! File names, directory names and default hyper-parameters shared by the
//! training pipeline and the predictor.

pub const ARTIFACTS_DIR: &str = "artifacts";
pub const LOGS_DIR: &str = "logs";
pub const LOGS_FILE_NAME: &str = "ner.log";

pub const BEST_MODEL_DIR: &str = "best_model";

/// Default bucket holding the dataset archive and the promoted model.
pub const BUCKET_NAME: &str = "ner-using-bert-1";

// Data ingestion
pub const DATA_INGESTION_ARTIFACTS_DIR: &str = "DataIngestion";
pub const DATA_FILE_NAME: &str = "archive.zip";
pub const CSV_DATA_FILE_NAME: &str = "ner.csv";

// Data transformation
pub const DATA_TRANSFORMATION_ARTIFACTS_DIR: &str = "DataTransformation";
pub const LABELS_TO_IDS_FILE_NAME: &str = "labels_to_ids.json";
pub const IDS_TO_LABELS_FILE_NAME: &str = "ids_to_labels.json";
pub const DF_TRAIN_FILE_NAME: &str = "df_train.json";
pub const DF_VAL_FILE_NAME: &str = "df_val.json";
pub const DF_TEST_FILE_NAME: &str = "df_test.json";
pub const UNIQUE_LABELS_FILE_NAME: &str = "unique_labels.json";

/// Rows kept from the head of the dataset before splitting.
pub const MAX_ROWS: usize = 1000;
pub const SPLIT_SEED: u64 = 42;

// Model training
pub const MODEL_TRAINING_ARTIFACTS_DIR: &str = "ModelTrainer";
pub const LEARNING_RATE: f64 = 5e-3;
pub const EPOCHS: usize = 1;
pub const BATCH_SIZE: usize = 2;
pub const MAX_SEQ_LEN: usize = 512;
pub const PRETRAINED_DIR: &str = "models/bert-base-cased";

// Model bundle
pub const MODEL_FILE_NAME: &str = "model.safetensors";
pub const MODEL_CONFIG_FILE_NAME: &str = "config.json";
pub const TOKENIZER_FILE_NAME: &str = "tokenizer.json";

// Model evaluation / pushing
pub const MODEL_EVALUATION_ARTIFACTS_DIR: &str = "ModelEvaluation";
pub const MODEL_PUSHER_ARTIFACTS_DIR: &str = "ModelPusher";

/// Label id for positions excluded from loss and accuracy.
pub const SENTINEL_LABEL: i64 = -100;
