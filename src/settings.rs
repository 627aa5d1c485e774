//! Detection settings and the flat buffer layouts they define.
//!
//! Settings are plain `serde` structs, usually loaded from a JSON file:
//!
//! ```json
//! {
//!   "category_count": 20,
//!   "boxes_per_cell": 2,
//!   "grid_side_length": 7,
//!   "detection_threshold": 0.2,
//!   "nms": true
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VocEvalError};

/// Configuration of a grid detector and its post-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSettings {
    pub category_count: usize,
    pub boxes_per_cell: usize,
    pub detection_threshold: f32,
    /// Name of the shape encoding backend, informational only.
    #[serde(default)]
    pub encoding: String,
    pub grid_side_length: usize,
    #[serde(default = "default_true")]
    pub nms: bool,
    #[serde(default = "default_params_per_box")]
    pub params_per_box: usize,
    #[serde(default = "default_params_per_confidence_score")]
    pub params_per_confidence_score: usize,
    #[serde(default)]
    pub params_per_shape_encoding: usize,
    /// Single-class mode: category 0 carries the raw box confidence.
    #[serde(default)]
    pub only_objectness: bool,
    #[serde(default = "default_overlap_threshold")]
    pub overlap_threshold: f32,
    #[serde(default = "default_shape_scale")]
    pub shape_scale: f32,
    /// The network predicts the square root of width and height.
    #[serde(default = "default_true")]
    pub use_square: bool,
}

fn default_true() -> bool {
    true
}

fn default_params_per_box() -> usize {
    4
}

fn default_params_per_confidence_score() -> usize {
    1
}

fn default_overlap_threshold() -> f32 {
    0.5
}

fn default_shape_scale() -> f32 {
    0.1
}

impl DetectionSettings {
    /// Settings for a box-only detector with the default thresholds.
    pub fn new(category_count: usize, boxes_per_cell: usize, grid_side_length: usize) -> Self {
        Self {
            category_count,
            boxes_per_cell,
            detection_threshold: 0.2,
            encoding: String::new(),
            grid_side_length,
            nms: true,
            params_per_box: default_params_per_box(),
            params_per_confidence_score: default_params_per_confidence_score(),
            params_per_shape_encoding: 0,
            only_objectness: false,
            overlap_threshold: default_overlap_threshold(),
            shape_scale: default_shape_scale(),
            use_square: true,
        }
    }

    /// Check that the settings describe a usable layout.
    pub fn validate(&self) -> Result<()> {
        if self.category_count == 0 {
            return Err(VocEvalError::InvalidSettings(
                "category_count must be at least 1".to_string(),
            ));
        }
        if self.grid_side_length == 0 {
            return Err(VocEvalError::InvalidSettings(
                "grid_side_length must be at least 1".to_string(),
            ));
        }
        if self.boxes_per_cell == 0 {
            return Err(VocEvalError::InvalidSettings(
                "boxes_per_cell must be at least 1".to_string(),
            ));
        }
        if self.params_per_box != 4 {
            return Err(VocEvalError::InvalidSettings(format!(
                "params_per_box must be 4, got {}",
                self.params_per_box
            )));
        }
        if self.params_per_confidence_score != 1 {
            return Err(VocEvalError::InvalidSettings(format!(
                "params_per_confidence_score must be 1, got {}",
                self.params_per_confidence_score
            )));
        }
        if !(0.0..=1.0).contains(&self.detection_threshold) {
            return Err(VocEvalError::InvalidThreshold(format!(
                "detection_threshold must be between 0.0 and 1.0, got {}",
                self.detection_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(VocEvalError::InvalidThreshold(format!(
                "overlap_threshold must be between 0.0 and 1.0, got {}",
                self.overlap_threshold
            )));
        }
        Ok(())
    }

    /// Buffer layout for these settings.
    pub fn layout(&self) -> GridLayout {
        GridLayout {
            side: self.grid_side_length,
            categories: self.category_count,
            boxes_per_cell: self.boxes_per_cell,
            params_per_box: self.params_per_box,
            params_per_confidence: self.params_per_confidence_score,
            params_per_shape: self.params_per_shape_encoding,
        }
    }
}

/// Index arithmetic for the prediction and training-target buffers.
///
/// Prediction buffer, cells in row-major order:
///
/// ```text
/// [ class probabilities: S*S*C ][ box confidences: S*S*B ][ boxes + shapes: S*S*B*(P+E) ]
/// ```
///
/// Training-target buffer, one record per cell:
///
/// ```text
/// [ confidence ][ class pmf: C ][ box: P ][ shape: E ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    side: usize,
    categories: usize,
    boxes_per_cell: usize,
    params_per_box: usize,
    params_per_confidence: usize,
    params_per_shape: usize,
}

impl GridLayout {
    pub fn side(&self) -> usize {
        self.side
    }

    pub fn cell_count(&self) -> usize {
        self.side * self.side
    }

    /// `(row, col)` of a cell.
    pub fn cell_position(&self, cell: usize) -> (usize, usize) {
        (cell / self.side, cell % self.side)
    }

    pub fn class_index(&self, cell: usize, category: usize) -> usize {
        cell * self.categories + category
    }

    pub fn confidence_index(&self, cell: usize, slot: usize) -> usize {
        self.cell_count() * self.categories + cell * self.boxes_per_cell + slot
    }

    pub fn box_index(&self, cell: usize, slot: usize) -> usize {
        self.cell_count() * (self.categories + self.boxes_per_cell)
            + (cell * self.boxes_per_cell + slot) * (self.params_per_box + self.params_per_shape)
    }

    pub fn shape_index(&self, cell: usize, slot: usize) -> usize {
        self.box_index(cell, slot) + self.params_per_box
    }

    pub fn prediction_len(&self) -> usize {
        self.cell_count()
            * (self.categories
                + self.boxes_per_cell
                + self.boxes_per_cell * (self.params_per_box + self.params_per_shape))
    }

    pub fn target_params_per_cell(&self) -> usize {
        self.params_per_confidence + self.params_per_box + self.params_per_shape + self.categories
    }

    pub fn target_cell_index(&self, cell: usize) -> usize {
        cell * self.target_params_per_cell()
    }

    pub fn target_len(&self) -> usize {
        self.cell_count() * self.target_params_per_cell()
    }
}

/// Load detection settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or fails validation.
///
/// # Example
///
/// ```no_run
/// use voc_eval::settings::load_from_file;
///
/// let settings = load_from_file("detector.json").unwrap();
/// println!("{} categories", settings.category_count);
/// ```
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<DetectionSettings> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let settings: DetectionSettings = serde_json::from_reader(reader)?;

    settings.validate()?;

    Ok(settings)
}

/// Load detection settings from a JSON string.
///
/// # Example
///
/// ```
/// use voc_eval::settings::load_from_str;
///
/// let json = r#"{
///     "category_count": 20,
///     "boxes_per_cell": 2,
///     "grid_side_length": 7,
///     "detection_threshold": 0.2
/// }"#;
/// let settings = load_from_str(json).unwrap();
/// assert!(settings.use_square);
/// assert_eq!(settings.layout().prediction_len(), 7 * 7 * (20 + 2 + 2 * 4));
/// ```
pub fn load_from_str(json: &str) -> Result<DetectionSettings> {
    let settings: DetectionSettings = serde_json::from_str(json)?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let json = r#"{
            "category_count": 3,
            "boxes_per_cell": 2,
            "grid_side_length": 7,
            "detection_threshold": 0.1
        }"#;
        let settings = load_from_str(json).unwrap();
        assert!(settings.nms);
        assert!(settings.use_square);
        assert!(!settings.only_objectness);
        assert_eq!(settings.params_per_box, 4);
        assert_eq!(settings.params_per_confidence_score, 1);
        assert_eq!(settings.params_per_shape_encoding, 0);
        assert!((settings.overlap_threshold - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_validation_failures() {
        let mut settings = DetectionSettings::new(3, 2, 7);
        settings.grid_side_length = 0;
        assert!(matches!(settings.validate(), Err(VocEvalError::InvalidSettings(_))));

        let mut settings = DetectionSettings::new(3, 2, 7);
        settings.params_per_box = 5;
        assert!(matches!(settings.validate(), Err(VocEvalError::InvalidSettings(_))));

        let mut settings = DetectionSettings::new(3, 2, 7);
        settings.detection_threshold = 1.5;
        assert!(matches!(settings.validate(), Err(VocEvalError::InvalidThreshold(_))));
    }

    #[test]
    fn test_prediction_layout() {
        let mut settings = DetectionSettings::new(3, 2, 2);
        settings.params_per_shape_encoding = 5;
        let layout = settings.layout();

        assert_eq!(layout.cell_count(), 4);
        assert_eq!(layout.class_index(1, 2), 5);
        assert_eq!(layout.confidence_index(0, 0), 12);
        assert_eq!(layout.confidence_index(3, 1), 12 + 7);
        assert_eq!(layout.box_index(0, 0), 4 * 5);
        assert_eq!(layout.box_index(1, 1), 20 + 3 * 9);
        assert_eq!(layout.shape_index(1, 1), 20 + 3 * 9 + 4);
        assert_eq!(layout.prediction_len(), 4 * (3 + 2 + 2 * 9));
        assert_eq!(layout.box_index(3, 1) + 9, layout.prediction_len());
    }

    #[test]
    fn test_target_layout() {
        let settings = DetectionSettings::new(3, 2, 7);
        let layout = settings.layout();
        assert_eq!(layout.target_params_per_cell(), 1 + 4 + 3);
        assert_eq!(layout.target_cell_index(2), 16);
        assert_eq!(layout.target_len(), 49 * 8);
        assert_eq!(layout.cell_position(10), (1, 3));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_from_file("/nonexistent/detector.json");
        assert!(matches!(result, Err(VocEvalError::IoError(_))));
    }
}
