//! # Label Vocabulary
//!
//! Bidirectional mapping between entity tags (usually BIO-scheme strings such
//! as `B-geo` or `O`) and contiguous integer ids. The mapping is built once
//! from the training subset and reused verbatim by evaluation and prediction.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::dataset::NerRecord;
use crate::error::{NerError, Result};

/// Tag ↔ id vocabulary with ids `0..len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocab {
    labels: Vec<String>,
    ids: HashMap<String, u32>,
}

impl LabelVocab {
    /// Build a vocabulary from an explicit tag list. Duplicates are dropped and
    /// ids follow sorted tag order.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        let labels: Vec<String> = unique.into_iter().collect();
        let ids = labels
            .iter()
            .enumerate()
            .map(|(id, tag)| (tag.clone(), id as u32))
            .collect();
        Self { labels, ids }
    }

    /// Collect every tag appearing in the records.
    pub fn from_records(records: &[NerRecord]) -> Self {
        Self::new(records.iter().flat_map(|r| r.tags()))
    }

    /// Rebuild from a persisted id → label map.
    ///
    /// Ids must be exactly `0..n`; anything else means the file was not
    /// produced by this vocabulary.
    pub fn from_ids_to_labels(map: &BTreeMap<u32, String>) -> Result<Self> {
        let mut labels = Vec::with_capacity(map.len());
        for (expected, (&id, tag)) in map.iter().enumerate() {
            if id as usize != expected {
                return Err(NerError::InvalidModel(format!(
                    "label ids are not contiguous: expected {expected}, found {id}"
                )));
            }
            labels.push(tag.clone());
        }
        let ids = labels
            .iter()
            .enumerate()
            .map(|(id, tag)| (tag.clone(), id as u32))
            .collect::<HashMap<_, _>>();
        if ids.len() != labels.len() {
            return Err(NerError::InvalidModel(
                "duplicate tag in id to label map".into(),
            ));
        }
        Ok(Self { labels, ids })
    }

    /// Id of a tag.
    pub fn id_of(&self, tag: &str) -> Option<u32> {
        self.ids.get(tag).copied()
    }

    /// Tag of an id.
    pub fn label_of(&self, id: u32) -> Option<&str> {
        self.labels.get(id as usize).map(String::as_str)
    }

    /// Unique labels in id order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Tag → id view, as persisted in `labels_to_ids.json`.
    pub fn labels_to_ids(&self) -> BTreeMap<String, u32> {
        self.ids.iter().map(|(k, &v)| (k.clone(), v)).collect()
    }

    /// Id → tag view, as persisted in `ids_to_labels.json`.
    pub fn ids_to_labels(&self) -> BTreeMap<u32, String> {
        self.labels
            .iter()
            .enumerate()
            .map(|(id, tag)| (id as u32, tag.clone()))
            .collect()
    }
}
