//! # Sub-word Label Alignment
//!
//! A sub-word tokenizer may split one word into several model inputs. Only
//! the first sub-word of each word carries the word's label; special tokens,
//! padding and continuation sub-words are masked with [`SENTINEL_LABEL`] so
//! they are excluded from the loss and from accuracy.
//!
//! The mask ([`token_roles`]) is shared by training and inference. Training
//! additionally assigns ground-truth ids with [`align_labels`]; inference only
//! needs the scored positions from [`scored_positions`].

use crate::constants::SENTINEL_LABEL;
use crate::labels::LabelVocab;

/// What a sub-word position represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRole {
    /// No originating word: `[CLS]`, `[SEP]`, padding.
    Special,
    /// First sub-word of word `n`.
    WordStart(u32),
    /// Later sub-word of word `n`.
    Continuation(u32),
}

impl TokenRole {
    pub fn is_word_start(&self) -> bool {
        matches!(self, TokenRole::WordStart(_))
    }
}

/// Whether continuation sub-words repeat the word's label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelPolicy {
    pub label_all_tokens: bool,
}

/// Classify every sub-word position from the tokenizer's word ids.
pub fn token_roles(word_ids: &[Option<u32>]) -> Vec<TokenRole> {
    let mut previous = None;
    word_ids
        .iter()
        .map(|&word| {
            let role = match word {
                None => TokenRole::Special,
                Some(w) if Some(w) != previous => TokenRole::WordStart(w),
                Some(w) => TokenRole::Continuation(w),
            };
            previous = word;
            role
        })
        .collect()
}

/// Positions whose logits correspond to a word's first sub-word.
pub fn scored_positions(roles: &[TokenRole]) -> Vec<usize> {
    roles
        .iter()
        .enumerate()
        .filter(|(_, role)| role.is_word_start())
        .map(|(pos, _)| pos)
        .collect()
}

/// Assign a label id per sub-word position.
///
/// A word whose index is past the end of `word_tags`, or whose tag is not in
/// the vocabulary, is masked rather than rejected: the tokenizer's
/// pre-tokenizer may split punctuation into more words than the dataset's
/// whitespace tagging has.
pub fn align_labels(
    roles: &[TokenRole],
    word_tags: &[String],
    vocab: &LabelVocab,
    policy: LabelPolicy,
) -> Vec<i64> {
    let label_for = |word: u32| {
        word_tags
            .get(word as usize)
            .and_then(|tag| vocab.id_of(tag))
            .map_or(SENTINEL_LABEL, i64::from)
    };

    roles
        .iter()
        .map(|role| match *role {
            TokenRole::Special => SENTINEL_LABEL,
            TokenRole::WordStart(w) => label_for(w),
            TokenRole::Continuation(w) if policy.label_all_tokens => label_for(w),
            TokenRole::Continuation(_) => SENTINEL_LABEL,
        })
        .collect()
}
