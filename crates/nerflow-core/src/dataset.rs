//! # Labeled Dataset
//!
//! CSV loading, head subsetting and the seeded train/val/test split.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NerError, Result};

/// One labeled sentence: whitespace-separated words in `text` and one
/// whitespace-separated tag per word in `labels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerRecord {
    pub text: String,
    pub labels: String,
}

impl NerRecord {
    pub fn new(text: impl Into<String>, labels: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            labels: labels.into(),
        }
    }

    /// Per-word tags.
    pub fn tags(&self) -> Vec<String> {
        self.labels.split_whitespace().map(str::to_string).collect()
    }
}

/// Read a CSV file with `text` and `labels` columns.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<NerRecord>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: NerRecord = row?;
        records.push(record);
    }
    tracing::debug!(rows = records.len(), path = %path.as_ref().display(), "read dataset csv");
    Ok(records)
}

/// Keep the first `max_rows` rows.
pub fn subset(mut records: Vec<NerRecord>, max_rows: usize) -> Vec<NerRecord> {
    records.truncate(max_rows);
    records
}

/// Shuffle `0..n` with a seeded Fisher-Yates pass and cut it at
/// `floor(0.8n)` and `floor(0.9n)`.
pub fn split_indices(n: usize, seed: u64) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = oorandom::Rand64::new(u128::from(seed));
    for i in (1..n).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        indices.swap(i, j);
    }

    let train_end = n * 8 / 10;
    let val_end = n * 9 / 10;
    let test = indices.split_off(val_end);
    let val = indices.split_off(train_end);
    (indices, val, test)
}

/// Train/validation/test partition of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSplit {
    pub train: Vec<NerRecord>,
    pub val: Vec<NerRecord>,
    pub test: Vec<NerRecord>,
}

impl DatasetSplit {
    pub fn from_records(records: &[NerRecord], seed: u64) -> Result<Self> {
        if records.is_empty() {
            return Err(NerError::InvalidDataset("no rows to split".into()));
        }

        let (train, val, test) = split_indices(records.len(), seed);
        let pick = |idx: &[usize]| idx.iter().map(|&i| records[i].clone()).collect::<Vec<_>>();

        Ok(Self {
            train: pick(&train),
            val: pick(&val),
            test: pick(&test),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_split_sizes() {
        for n in [1usize, 7, 10, 33, 101, 1000] {
            let (train, val, test) = split_indices(n, 42);
            assert_eq!(train.len(), n * 8 / 10, "train size for n={n}");
            assert_eq!(val.len(), n * 9 / 10 - n * 8 / 10, "val size for n={n}");
            assert_eq!(test.len(), n - n * 9 / 10, "test size for n={n}");
        }
    }

    #[test]
    fn test_split_partitions_input() {
        let (train, val, test) = split_indices(257, 42);
        let mut seen = HashSet::new();
        for idx in train.iter().chain(&val).chain(&test) {
            assert!(seen.insert(*idx), "index {idx} appears twice");
        }
        assert_eq!(seen.len(), 257);
        assert!(seen.iter().all(|&i| i < 257));
    }

    #[test]
    fn test_split_is_deterministic() {
        assert_eq!(split_indices(50, 42), split_indices(50, 42));
        assert_ne!(split_indices(50, 42), split_indices(50, 7));
    }

    #[test]
    fn test_split_shuffles() {
        let (train, _, _) = split_indices(100, 42);
        let identity: Vec<usize> = (0..80).collect();
        assert_ne!(train, identity);
    }

    #[test]
    fn test_dataset_split_from_records() {
        let records: Vec<NerRecord> = (0..20)
            .map(|i| NerRecord::new(format!("word{i}"), "O"))
            .collect();
        let split = DatasetSplit::from_records(&records, 42).unwrap();
        assert_eq!(split.train.len(), 16);
        assert_eq!(split.val.len(), 2);
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        assert!(DatasetSplit::from_records(&[], 42).is_err());
    }

    #[test]
    fn test_subset_keeps_head() {
        let records: Vec<NerRecord> = (0..5).map(|i| NerRecord::new(i.to_string(), "O")).collect();
        let head = subset(records, 3);
        assert_eq!(head.len(), 3);
        assert_eq!(head[2].text, "2");
    }

    #[test]
    fn test_read_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "text,labels").unwrap();
        writeln!(file, "\"Thousands of demonstrators\",\"O O O\"").unwrap();
        writeln!(file, "\"London calling\",\"B-geo O\"").unwrap();
        file.flush().unwrap();

        let records = read_csv(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text, "London calling");
        assert_eq!(records[1].tags(), vec!["B-geo", "O"]);
    }

    #[test]
    fn test_read_csv_missing_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sentence,tags").unwrap();
        writeln!(file, "a,O").unwrap();
        file.flush().unwrap();

        assert!(matches!(read_csv(file.path()), Err(NerError::Csv(_))));
    }
}
