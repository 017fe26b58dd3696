//! Data transformation: subset, label vocabulary and the train/val/test split.

use anyhow::{Context, Result};
use tracing::info;

use nerflow_core::dataset::{read_csv, subset};
use nerflow_core::store::write_json;
use nerflow_core::{DatasetSplit, LabelVocab};

use crate::artifacts::{DataIngestionArtifact, DataTransformationArtifact, record};
use crate::config::DataTransformationConfig;

pub struct DataTransformation {
    config: DataTransformationConfig,
}

impl DataTransformation {
    pub fn new(config: DataTransformationConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, ingestion: &DataIngestionArtifact) -> Result<DataTransformationArtifact> {
        info!(dir = %self.config.dir.display(), "started data transformation");
        std::fs::create_dir_all(&self.config.dir)
            .with_context(|| format!("creating {}", self.config.dir.display()))?;

        let records = read_csv(&ingestion.csv_path)
            .with_context(|| format!("reading {}", ingestion.csv_path.display()))?;
        let total = records.len();
        let records = subset(records, self.config.max_rows);
        info!(rows = records.len(), total, "subset dataset");

        let vocab = LabelVocab::from_records(&records);
        info!(labels = vocab.len(), "built label vocabulary");

        let split = DatasetSplit::from_records(&records, self.config.seed)?;
        info!(
            train = split.train.len(),
            val = split.val.len(),
            test = split.test.len(),
            "split dataset"
        );

        write_json(&self.config.labels_to_ids_path, &vocab.labels_to_ids())?;
        write_json(&self.config.ids_to_labels_path, &vocab.ids_to_labels())?;
        write_json(&self.config.unique_labels_path, vocab.labels())?;
        write_json(&self.config.train_path, &split.train)?;
        write_json(&self.config.val_path, &split.val)?;
        write_json(&self.config.test_path, &split.test)?;

        let artifact = DataTransformationArtifact {
            labels_to_ids_path: self.config.labels_to_ids_path.clone(),
            ids_to_labels_path: self.config.ids_to_labels_path.clone(),
            unique_labels_path: self.config.unique_labels_path.clone(),
            train_path: self.config.train_path.clone(),
            val_path: self.config.val_path.clone(),
            test_path: self.config.test_path.clone(),
            num_labels: vocab.len(),
        };
        record(&self.config.dir, &artifact)?;
        info!("data transformation completed");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::{PipelineConfig, TrainingParams};
    use crate::test_support::sample_rows;
    use nerflow_core::NerRecord;
    use nerflow_core::store::read_json;

    fn ingested(dir: &std::path::Path, rows: &[(String, String)]) -> DataIngestionArtifact {
        let csv_path = dir.join("ner.csv");
        let mut body = String::from("text,labels\n");
        for (text, labels) in rows {
            body.push_str(&format!("{text},{labels}\n"));
        }
        std::fs::write(&csv_path, body).unwrap();
        DataIngestionArtifact {
            zip_path: dir.join("archive.zip"),
            csv_path,
        }
    }

    #[test]
    fn test_transformation_writes_splits_and_vocab() {
        let dir = tempfile::tempdir().unwrap();
        let params = TrainingParams {
            max_rows: 10,
            ..Default::default()
        };
        let config = PipelineConfig::default()
            .with_artifacts_dir(dir.path().join("run"))
            .with_params(params);
        let ingestion = ingested(dir.path(), &sample_rows(25));

        let artifact = DataTransformation::new(config.data_transformation())
            .run(&ingestion)
            .unwrap();

        let train: Vec<NerRecord> = read_json(&artifact.train_path).unwrap();
        let val: Vec<NerRecord> = read_json(&artifact.val_path).unwrap();
        let test: Vec<NerRecord> = read_json(&artifact.test_path).unwrap();
        assert_eq!((train.len(), val.len(), test.len()), (8, 1, 1));

        let labels_to_ids: BTreeMap<String, u32> =
            read_json(&artifact.labels_to_ids_path).unwrap();
        let ids_to_labels: BTreeMap<u32, String> =
            read_json(&artifact.ids_to_labels_path).unwrap();
        for (tag, id) in &labels_to_ids {
            assert_eq!(&ids_to_labels[id], tag);
        }
        assert_eq!(artifact.num_labels, labels_to_ids.len());

        let unique: Vec<String> = read_json(&artifact.unique_labels_path).unwrap();
        assert_eq!(unique.len(), artifact.num_labels);
    }

    #[test]
    fn test_transformation_rejects_empty_csv() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default().with_artifacts_dir(dir.path().join("run"));
        let ingestion = ingested(dir.path(), &[]);

        assert!(
            DataTransformation::new(config.data_transformation())
                .run(&ingestion)
                .is_err()
        );
    }
}
