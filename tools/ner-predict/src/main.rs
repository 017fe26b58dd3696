//! NER Prediction Tool
//!
//! Downloads the promoted model bundle from the bucket and tags sentences,
//! printing one JSON object per sentence.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nerflow_core::constants::{BEST_MODEL_DIR, BUCKET_NAME, MAX_SEQ_LEN};
use nerflow_core::{GsutilStore, LocalBucket, ModelPredictor, ObjectStore, Predictor, select_device};

/// CLI arguments
#[derive(Parser)]
#[command(name = "ner-predict")]
#[command(about = "Tag sentences with the promoted NER model")]
#[command(version)]
struct Cli {
    /// Sentence to tag; reads one sentence per line from stdin when omitted
    sentence: Option<String>,

    /// Bucket holding the promoted model
    #[arg(short, long, env = "NER_BUCKET", default_value = BUCKET_NAME)]
    bucket: String,

    /// Use a local directory as the bucket instead of gsutil
    #[arg(long, env = "NER_LOCAL_BUCKET")]
    local_bucket: Option<PathBuf>,

    /// Where the model bundle is downloaded
    #[arg(short = 'd', long, env = "NER_BEST_MODEL_DIR", default_value = BEST_MODEL_DIR)]
    best_model_dir: PathBuf,

    /// Maximum sub-word sequence length
    #[arg(long, env = "NER_MAX_LENGTH", default_value_t = MAX_SEQ_LEN)]
    max_length: usize,
}

fn print_prediction(predictor: &Predictor, sentence: &str, out: &mut impl Write) -> Result<()> {
    let prediction = predictor
        .predict(sentence)
        .with_context(|| format!("tagging {sentence:?}"))?;
    serde_json::to_writer(&mut *out, &prediction)?;
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays JSON only.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store: Box<dyn ObjectStore> = match cli.local_bucket {
        Some(dir) => Box::new(LocalBucket::new(dir)),
        None => Box::new(GsutilStore::new(cli.bucket)),
    };

    let predictor = ModelPredictor::new(store)
        .with_best_model_dir(cli.best_model_dir)
        .with_max_length(cli.max_length)
        .load(&select_device())
        .context("loading the promoted model")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.sentence {
        Some(sentence) => print_prediction(&predictor, &sentence, &mut out)?,
        None => {
            let mut tagged = 0usize;
            for line in std::io::stdin().lock().lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                print_prediction(&predictor, &line, &mut out)?;
                tagged += 1;
            }
            info!(sentences = tagged, "finished tagging stdin");
        }
    }

    Ok(())
}
