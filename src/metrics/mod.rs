//! Metrics calculation modules for detection evaluation.

pub mod iou;
pub mod ap;
pub mod precision_recall;
pub mod f1_score;

pub use iou::calculate_overlap;
pub use ap::{calculate_ap, calculate_map, calculate_map_volume};
pub use precision_recall::{calculate_precision_recall, calculate_precision_recall_curve, PrecisionRecallCurve};
pub use f1_score::{calculate_f1_score, calculate_image_score};
