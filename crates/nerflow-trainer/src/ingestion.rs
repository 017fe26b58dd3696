//! Data ingestion: fetch the dataset archive from the bucket and unpack it.

use anyhow::{Context, Result, bail};
use tracing::info;

use nerflow_core::ObjectStore;
use nerflow_core::archive::extract_all;

use crate::artifacts::{DataIngestionArtifact, record};
use crate::config::DataIngestionConfig;

pub struct DataIngestion<'a, S: ObjectStore + ?Sized> {
    config: DataIngestionConfig,
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> DataIngestion<'a, S> {
    pub fn new(config: DataIngestionConfig, store: &'a S) -> Self {
        Self { config, store }
    }

    pub fn run(&self) -> Result<DataIngestionArtifact> {
        info!(dir = %self.config.dir.display(), "started data ingestion");
        std::fs::create_dir_all(&self.config.dir)
            .with_context(|| format!("creating {}", self.config.dir.display()))?;

        self.store
            .download(&self.config.data_object, &self.config.zip_path)
            .with_context(|| {
                format!(
                    "downloading {} from bucket {}",
                    self.config.data_object,
                    self.store.bucket()
                )
            })?;

        let extracted = extract_all(&self.config.zip_path, &self.config.dir)
            .with_context(|| format!("extracting {}", self.config.zip_path.display()))?;
        info!(files = extracted.len(), "extracted dataset archive");

        if !self.config.csv_path.is_file() {
            bail!(
                "archive {} does not contain {}",
                self.config.zip_path.display(),
                self.config.csv_path.display()
            );
        }

        let artifact = DataIngestionArtifact {
            zip_path: self.config.zip_path.clone(),
            csv_path: self.config.csv_path.clone(),
        };
        record(&self.config.dir, &artifact)?;
        info!(csv = %artifact.csv_path.display(), "data ingestion completed");
        Ok(artifact)
    }
}
