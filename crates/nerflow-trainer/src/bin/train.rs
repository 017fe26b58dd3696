use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use nerflow_core::constants::{
    BATCH_SIZE, BUCKET_NAME, DATA_FILE_NAME, EPOCHS, LEARNING_RATE, LOGS_DIR, LOGS_FILE_NAME,
    MAX_ROWS, MAX_SEQ_LEN, PRETRAINED_DIR, SPLIT_SEED,
};
use nerflow_core::{GsutilStore, LocalBucket, ObjectStore};
use nerflow_trainer::{PipelineConfig, TrainingParams, TrainingPipeline};

/// Train a BERT token classifier and promote it when it beats the current one.
#[derive(Parser)]
#[command(name = "train")]
#[command(version)]
struct Cli {
    /// Bucket holding the dataset archive and the promoted model
    #[arg(short, long, env = "NER_BUCKET", default_value = BUCKET_NAME)]
    bucket: String,

    /// Use a local directory as the bucket instead of gsutil
    #[arg(long, env = "NER_LOCAL_BUCKET")]
    local_bucket: Option<PathBuf>,

    /// Dataset archive object name
    #[arg(long, env = "NER_DATA_OBJECT", default_value = DATA_FILE_NAME)]
    data_object: String,

    /// Artifacts directory (default: artifacts/<timestamp>)
    #[arg(short, long, env = "NER_ARTIFACTS_DIR")]
    artifacts_dir: Option<PathBuf>,

    /// Directory with the pretrained config.json, tokenizer.json and model.safetensors
    #[arg(short, long, env = "NER_PRETRAINED_DIR", default_value = PRETRAINED_DIR)]
    pretrained_dir: PathBuf,

    #[arg(long, env = "NER_EPOCHS", default_value_t = EPOCHS)]
    epochs: usize,

    #[arg(long, env = "NER_BATCH_SIZE", default_value_t = BATCH_SIZE)]
    batch_size: usize,

    #[arg(long, env = "NER_LEARNING_RATE", default_value_t = LEARNING_RATE)]
    learning_rate: f64,

    #[arg(long, env = "NER_MAX_LENGTH", default_value_t = MAX_SEQ_LEN)]
    max_length: usize,

    #[arg(long, env = "NER_MAX_ROWS", default_value_t = MAX_ROWS)]
    max_rows: usize,

    #[arg(long, env = "NER_SEED", default_value_t = SPLIT_SEED)]
    seed: u64,

    /// Label every sub-word of a word, not only the first
    #[arg(long)]
    label_all_tokens: bool,

    /// Also write logs to this file (logs/ner.log when given without a value)
    #[arg(long, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let log_file = cli
        .log_file
        .map(|path| path.unwrap_or_else(|| PathBuf::from(LOGS_DIR).join(LOGS_FILE_NAME)));
    init_logging(log_file.as_ref())?;

    let params = TrainingParams {
        learning_rate: cli.learning_rate,
        epochs: cli.epochs,
        batch_size: cli.batch_size,
        max_length: cli.max_length,
        max_rows: cli.max_rows,
        seed: cli.seed,
        label_all_tokens: cli.label_all_tokens,
    };
    let mut config = PipelineConfig::default()
        .with_bucket(&cli.bucket)
        .with_data_object(cli.data_object)
        .with_pretrained_dir(cli.pretrained_dir)
        .with_params(params);
    if let Some(dir) = cli.artifacts_dir {
        config = config.with_artifacts_dir(dir);
    }

    let store: Box<dyn ObjectStore> = match cli.local_bucket {
        Some(dir) => Box::new(LocalBucket::new(dir)),
        None => Box::new(GsutilStore::new(cli.bucket)),
    };

    let outcome = TrainingPipeline::new(config, store).run()?;
    tracing::info!(
        accepted = outcome.evaluation.is_model_accepted,
        trained = outcome.evaluation.trained_model_accuracy,
        "done"
    );
    Ok(())
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Training failed: {e:#}");
        std::process::exit(1);
    }
}
