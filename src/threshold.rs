//! Score thresholding and overlap-threshold sweeps.

use crate::error::{Result, VocEvalError};
use crate::types::Detection;

/// Keep the detections whose best category score reaches `threshold`.
///
/// Suppressed scores do not count; a detection suppressed in every category is
/// dropped. Applying the same threshold twice gives the same result.
///
/// # Errors
///
/// Returns an error if the threshold is not in the valid range [0.0, 1.0].
///
/// # Example
///
/// ```
/// use voc_eval::geometry::VocBox;
/// use voc_eval::shape::Shape;
/// use voc_eval::threshold::prune;
/// use voc_eval::types::Detection;
///
/// let shape = Shape::new(VocBox::new(0, 0, 10, 10).unwrap());
/// let detections = vec![
///     Detection::new(shape.clone(), vec![0.9, 0.1]),
///     Detection::new(shape, vec![0.3, 0.1]),
/// ];
///
/// let kept = prune(&detections, 0.5).unwrap();
/// assert_eq!(kept.len(), 1);
/// ```
pub fn prune(detections: &[Detection], threshold: f32) -> Result<Vec<Detection>> {
    validate_threshold(threshold)?;

    Ok(detections
        .iter()
        .filter(|d| d.best().is_some_and(|(_, score)| score >= threshold))
        .cloned()
        .collect())
}

/// Inclusive sequence `start, start + step, ..., stop` of overlap thresholds.
///
/// Values are computed as `start + i * step` so rounding does not accumulate; the last
/// value is kept when it lands within a small tolerance of `stop`.
///
/// # Errors
///
/// Returns an error if either bound is outside [0.0, 1.0], `start > stop`, or
/// `step` is not positive.
///
/// # Example
///
/// ```
/// use voc_eval::threshold::overlap_threshold_range;
///
/// let thresholds = overlap_threshold_range(0.5, 0.95, 0.05).unwrap();
/// assert_eq!(thresholds.len(), 10);
/// assert!((thresholds[9] - 0.95).abs() < 1e-6);
/// ```
pub fn overlap_threshold_range(start: f32, stop: f32, step: f32) -> Result<Vec<f32>> {
    validate_threshold(start)?;
    validate_threshold(stop)?;

    if start > stop {
        return Err(VocEvalError::InvalidThreshold(format!(
            "Start threshold ({}) must be <= stop threshold ({})",
            start, stop
        )));
    }
    if !(step > 0.0) {
        return Err(VocEvalError::InvalidThreshold(format!(
            "Threshold step must be positive, got {}",
            step
        )));
    }

    let steps = ((stop - start) / step + 1e-4).floor() as usize;
    Ok((0..=steps).map(|i| start + step * i as f32).collect())
}

/// Validate that a threshold is in the valid range [0.0, 1.0].
pub(crate) fn validate_threshold(threshold: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(VocEvalError::InvalidThreshold(format!(
            "Threshold must be between 0.0 and 1.0, got {}",
            threshold
        )));
    }
    Ok(())
}
