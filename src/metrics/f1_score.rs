//! F1 Score calculation.

/// Calculate F1 score from precision and recall.
///
/// F1 score is the harmonic mean of precision and recall:
/// F1 = 2 × (Precision × Recall) / (Precision + Recall)
///
/// The denominator is offset by the smallest positive `f64`, and a non-finite
/// result is reported as `0.0`.
///
/// # Example
///
/// ```
/// use voc_eval::metrics::f1_score::calculate_f1_score;
///
/// let f1 = calculate_f1_score(0.8, 0.6);
/// assert!((f1 - 0.6857).abs() < 0.001);
/// assert_eq!(calculate_f1_score(0.0, 0.0), 0.0);
/// ```
pub fn calculate_f1_score(precision: f64, recall: f64) -> f64 {
    let f1 = (2.0 * precision * recall) / (precision + recall + f64::MIN_POSITIVE);
    if f1.is_finite() {
        f1
    } else {
        0.0
    }
}

/// Ranking score of an image: F1 plus a bonus of `0.1` per (overlap-weighted) true positive.
///
/// The bonus favours images with more correct detections among those with equal F1.
pub fn calculate_image_score(f1: f64, true_positives: f64) -> f64 {
    f1 + 0.1 * true_positives
}
