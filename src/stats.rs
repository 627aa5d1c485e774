//! Counters collected while decoding a prediction buffer.

use serde::{Deserialize, Serialize};

/// Statistics of a single decode call.
///
/// Every grid slot ends up in exactly one of three buckets: decoded, replaced
/// because of a NaN confidence, or replaced because its box fell outside the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Total number of grid slots visited
    pub total_slots: usize,

    /// Slots replaced by a degenerate detection because the confidence was NaN
    pub nan_confidences: usize,

    /// Slots replaced by a degenerate detection because the box was unusable
    pub invalid_boxes: usize,

    /// Slots whose shape encoding was decoded into a mask
    pub shape_decodes: usize,

    /// Slots with at least one category score at or above the detection threshold
    pub above_threshold: usize,
}

impl DecodeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_slot(&mut self) {
        self.total_slots += 1;
    }

    pub fn record_nan_confidence(&mut self) {
        self.nan_confidences += 1;
    }

    pub fn record_invalid_box(&mut self) {
        self.invalid_boxes += 1;
    }

    pub fn record_shape_decode(&mut self) {
        self.shape_decodes += 1;
    }

    pub fn record_above_threshold(&mut self) {
        self.above_threshold += 1;
    }

    /// Number of slots replaced by degenerate detections.
    pub fn degenerate(&self) -> usize {
        self.nan_confidences + self.invalid_boxes
    }

    /// Number of slots decoded from the buffer as-is.
    pub fn decoded(&self) -> usize {
        self.total_slots.saturating_sub(self.degenerate())
    }

    /// Get a formatted string summary of the statistics
    pub fn summary_string(&self) -> String {
        format!(
            "DecodeStats {{ total: {}, decoded: {}, nan: {}, invalid_boxes: {}, above_threshold: {}, shapes: {} }}",
            self.total_slots,
            self.decoded(),
            self.nan_confidences,
            self.invalid_boxes,
            self.above_threshold,
            self.shape_decodes,
        )
    }
}

impl std::fmt::Display for DecodeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary_string())
    }
}
