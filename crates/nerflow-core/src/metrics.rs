//! # Evaluation and Promotion
//!
//! Token accuracy over scored positions and the decision whether a newly
//! trained model replaces the incumbent.
//!
//! Accuracy is the per-example mean exact-match rate over non-sentinel
//! positions, summed over examples and divided by the number of examples.
//! Examples with no scored position contribute `0` so the result stays in
//! `[0, 1]`.

use crate::constants::SENTINEL_LABEL;
use crate::encoding::LabeledSentence;
use crate::error::Result;
use crate::model::TokenTagger;

/// Mean exact-match over the non-sentinel positions of one example.
///
/// `None` when no position is scored.
pub fn example_accuracy(predictions: &[u32], labels: &[i64]) -> Option<f64> {
    let mut scored = 0usize;
    let mut correct = 0usize;
    for (&pred, &label) in predictions.iter().zip(labels) {
        if label == SENTINEL_LABEL {
            continue;
        }
        scored += 1;
        if i64::from(pred) == label {
            correct += 1;
        }
    }
    (scored > 0).then(|| correct as f64 / scored as f64)
}

/// Running sum of per-example accuracies.
#[derive(Debug, Clone, Default)]
pub struct AccuracyAccumulator {
    total: f64,
    examples: usize,
}

impl AccuracyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_example(&mut self, predictions: &[u32], labels: &[i64]) {
        self.total += example_accuracy(predictions, labels).unwrap_or(0.0);
        self.examples += 1;
    }

    pub fn examples(&self) -> usize {
        self.examples
    }

    /// Summed per-example accuracy divided by the example count; `0` when empty.
    pub fn accuracy(&self) -> f64 {
        if self.examples == 0 {
            0.0
        } else {
            self.total / self.examples as f64
        }
    }
}

/// Score `model` on labeled sentences one example at a time.
pub fn evaluate<M: TokenTagger + ?Sized>(model: &M, dataset: &[LabeledSentence]) -> Result<f64> {
    let mut acc = AccuracyAccumulator::new();
    for example in dataset {
        let predictions = model.tag_positions(&example.encoded)?;
        acc.add_example(&predictions, &example.labels);
    }
    let accuracy = acc.accuracy();
    tracing::info!(examples = acc.examples(), accuracy, "evaluated model");
    Ok(accuracy)
}

/// Accept the new model iff it strictly beats the incumbent; a missing
/// incumbent scores `0`.
pub fn decide_promotion(new_accuracy: f64, incumbent_accuracy: Option<f64>) -> bool {
    new_accuracy > incumbent_accuracy.unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::TokenRole;
    use crate::encoding::EncodedSentence;

    /// Predicts a fixed id at every position.
    struct Constant(u32);

    impl TokenTagger for Constant {
        fn tag_positions(&self, sentence: &EncodedSentence) -> Result<Vec<u32>> {
            Ok(vec![self.0; sentence.len()])
        }
    }

    fn sentence(labels: Vec<i64>) -> LabeledSentence {
        let n = labels.len();
        LabeledSentence {
            encoded: EncodedSentence {
                input_ids: vec![1; n],
                type_ids: vec![0; n],
                attention_mask: vec![1; n],
                roles: vec![TokenRole::Special; n],
            },
            labels,
        }
    }

    #[test]
    fn test_promotion_decisions() {
        assert!(decide_promotion(0.91, Some(0.90)));
        assert!(!decide_promotion(0.80, Some(0.90)));
        assert!(decide_promotion(0.75, None));
        assert!(!decide_promotion(0.90, Some(0.90)));
        assert!(!decide_promotion(0.0, None));
    }

    #[test]
    fn test_example_accuracy() {
        assert_eq!(example_accuracy(&[1, 2, 0, 0], &[-100, 2, 1, -100]), Some(0.5));
        assert_eq!(example_accuracy(&[1, 1], &[-100, -100]), None);
        assert_eq!(example_accuracy(&[], &[]), None);
    }

    #[test]
    fn test_accuracy_divides_by_examples() {
        let mut acc = AccuracyAccumulator::new();
        // 1 of 1 correct, then 1 of 4 correct: (1.0 + 0.25) / 2
        acc.add_example(&[0], &[0]);
        acc.add_example(&[0, 0, 0, 0], &[0, 1, 1, 1]);
        assert!((acc.accuracy() - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_empty_scored_set_is_zero() {
        let mut acc = AccuracyAccumulator::new();
        assert_eq!(acc.accuracy(), 0.0);
        acc.add_example(&[3, 3], &[-100, -100]);
        assert_eq!(acc.accuracy(), 0.0);
    }

    #[test]
    fn test_evaluate_with_tagger() {
        let data = vec![
            sentence(vec![-100, 2, 2, -100]),
            sentence(vec![-100, 2, 0, -100]),
            sentence(vec![-100, -100]),
        ];
        let accuracy = evaluate(&Constant(2), &data).unwrap();
        assert!((accuracy - 0.5).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn test_evaluate_empty_dataset() {
        assert_eq!(evaluate(&Constant(0), &[]).unwrap(), 0.0);
    }
}
