//! Precision and recall calculation.

use crate::matching::MatchOutcome;

/// Cumulative precision and recall after each detection in score order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
}

impl PrecisionRecallCurve {
    pub fn len(&self) -> usize {
        self.precision.len()
    }

    pub fn is_empty(&self) -> bool {
        self.precision.is_empty()
    }
}

/// Calculate the precision-recall curve from match outcomes sorted by score.
///
/// "Don't care" outcomes add a point without moving either cumulative count.
/// Precision is `0.0` while no detection has counted yet, and recall is `0.0` when
/// there are no positives.
///
/// # Arguments
///
/// * `outcomes` - Match outcomes, sorted by confidence (descending)
/// * `positive_count` - Number of ground-truth objects that can be recalled
///
/// # Example
///
/// ```
/// use voc_eval::matching::MatchOutcome::{FalsePositive, TruePositive};
/// use voc_eval::metrics::precision_recall::calculate_precision_recall_curve;
///
/// let curve = calculate_precision_recall_curve(&[TruePositive, FalsePositive, TruePositive], 4);
/// assert_eq!(curve.recall, vec![0.25, 0.25, 0.5]);
/// assert!((curve.precision[2] - 2.0 / 3.0).abs() < 1e-10);
/// ```
pub fn calculate_precision_recall_curve(
    outcomes: &[MatchOutcome],
    positive_count: usize,
) -> PrecisionRecallCurve {
    let mut curve = PrecisionRecallCurve {
        precision: Vec::with_capacity(outcomes.len()),
        recall: Vec::with_capacity(outcomes.len()),
    };
    let mut tp = 0usize;
    let mut fp = 0usize;

    for outcome in outcomes {
        match outcome {
            MatchOutcome::TruePositive => tp += 1,
            MatchOutcome::FalsePositive => fp += 1,
            MatchOutcome::DontCare => {}
        }

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };

        let recall = if positive_count > 0 {
            tp as f64 / positive_count as f64
        } else {
            0.0
        };

        curve.precision.push(precision);
        curve.recall.push(recall);
    }

    curve
}

/// Precision and recall from weighted true positives, false positives and an object count.
///
/// Returns `(precision, recall)`, each `0.0` when its denominator is zero.
pub fn calculate_precision_recall(
    true_positives: f64,
    false_positives: f64,
    object_count: usize,
) -> (f64, f64) {
    let precision = if true_positives + false_positives > 0.0 {
        true_positives / (true_positives + false_positives)
    } else {
        0.0
    };

    let recall = if object_count > 0 {
        true_positives / object_count as f64
    } else {
        0.0
    };

    (precision, recall)
}
