//! # voc-eval
//!
//! Decoding, filtering and evaluation for grid-cell object detectors.
//!
//! A detector splits the image into an `S × S` grid; every cell predicts `B` boxes with a
//! confidence, one probability per category and optionally a shape encoding. This library
//! turns such prediction buffers into detections and measures them against ground truth:
//!
//! - **Geometry**: float `BoundingBox` and inclusive integer `VocBox` with overlap (IoU)
//! - **Grid codec**: decode prediction buffers, encode ground truth into training targets
//! - **Filtering**: score pruning and per-category non-maximal suppression
//! - **Evaluation**: AP per category, mAP and mAP volume over several overlap thresholds
//! - **Image scoring**: an F1-based score for ranking images by detection quality
//! - **Bounded queue**: a small SPSC queue for handing work between pipeline stages
//!
//! ## Quick Start
//!
//! ```rust
//! use voc_eval::{CategoryCatalog, DetectionSettings, Evaluator, GridCodec, GroundTruthIndex};
//! use voc_eval::geometry::VocBox;
//! use voc_eval::nms::postprocess;
//! use voc_eval::shape::Shape;
//! use voc_eval::types::GroundTruthObject;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = DetectionSettings::new(2, 1, 2);
//! let codec = GridCodec::new(&settings)?;
//!
//! // In actual use the buffer comes from network inference.
//! let buffer = vec![0.0f32; codec.layout().prediction_len()];
//! let detections = postprocess(&codec.decode(&buffer, 100, 100)?, &settings)?;
//!
//! let catalog = CategoryCatalog::new(["cat", "dog"])?;
//! let cat = GroundTruthObject::new(Shape::new(VocBox::new(10, 10, 50, 50)?), 0, false, "cat");
//! let evaluator = Evaluator::new(catalog, GroundTruthIndex::from_objects(vec![("img", vec![cat])]))?;
//!
//! let per_category = evaluator.flatten(&["img"], &[detections])?;
//! let report = evaluator.map(&per_category, 0.5)?;
//! println!("mAP: {:.4}", report.map);
//! # Ok(())
//! # }
//! ```
//!
//! ## Prediction layout
//!
//! For `C` categories, `B` boxes per cell and `E` shape parameters per box, a buffer holds
//! `S² · C` class probabilities, then `S² · B` confidences, then `S² · B · 4` box
//! parameters `(x, y, w, h)` relative to the cell, then `S² · B · E` shape parameters.

pub mod error;
pub mod geometry;
pub mod shape;
pub mod category;
pub mod types;
pub mod settings;
pub mod stats;
pub mod codec;
pub mod threshold;
pub mod nms;
pub mod ground_truth;
pub mod matching;
pub mod metrics;
pub mod evaluator;
pub mod queue;

// Re-export commonly used types and functions
pub use error::{Result, VocEvalError};
pub use geometry::{BoundingBox, VocBox};
pub use shape::{Mask, Shape, ShapeDescriptorCalculator};
pub use category::CategoryCatalog;
pub use types::{
    CategoryAp, Detection, GroundTruthObject, ImageScore, MapReport, MapVolumeReport,
    NamedCategoryDetection,
};
pub use settings::{load_from_file, load_from_str, DetectionSettings, GridLayout};
pub use stats::DecodeStats;
pub use codec::GridCodec;
pub use threshold::{overlap_threshold_range, prune};
pub use nms::{non_maximal_suppression, postprocess};
pub use ground_truth::{AnnotatedImage, BoxTransform, GroundTruthIndex, GroundTruthSource};
pub use evaluator::Evaluator;
pub use queue::BoundedQueue;
