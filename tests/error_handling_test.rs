//! Error handling and validation tests.

use voc_eval::category::CategoryCatalog;
use voc_eval::codec::GridCodec;
use voc_eval::error::VocEvalError;
use voc_eval::evaluator::Evaluator;
use voc_eval::geometry::{BoundingBox, VocBox};
use voc_eval::ground_truth::GroundTruthIndex;
use voc_eval::nms::non_maximal_suppression;
use voc_eval::queue::BoundedQueue;
use voc_eval::settings::{load_from_str, DetectionSettings};
use voc_eval::shape::{Mask, Shape};
use voc_eval::threshold::{overlap_threshold_range, prune};
use voc_eval::types::{Detection, GroundTruthObject, NamedCategoryDetection};

fn shape(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Shape {
    Shape::new(VocBox::new(xmin, ymin, xmax, ymax).unwrap())
}

fn evaluator() -> Evaluator {
    let index = GroundTruthIndex::from_objects(vec![(
        "img",
        vec![GroundTruthObject::new(shape(10, 10, 50, 50), 0, false, "cat")],
    )]);
    Evaluator::new(CategoryCatalog::new(["cat", "dog"]).unwrap(), index).unwrap()
}

// ============================================================================
// GEOMETRY ERRORS
// ============================================================================

#[test]
fn test_negative_voc_box() {
    let result = VocBox::new(-1, 0, 10, 10);
    assert!(matches!(result, Err(VocEvalError::InvalidGeometry(_))));
}

#[test]
fn test_inverted_voc_box() {
    assert!(matches!(VocBox::new(10, 0, 5, 10), Err(VocEvalError::InvalidGeometry(_))));
    assert!(matches!(VocBox::new(0, 10, 10, 5), Err(VocEvalError::InvalidGeometry(_))));
}

#[test]
fn test_negative_bounding_box() {
    assert!(matches!(
        BoundingBox::new(10.0, 10.0, -1.0, 5.0),
        Err(VocEvalError::InvalidGeometry(_))
    ));
    assert!(BoundingBox::new(f32::NAN, 0.0, 1.0, 1.0).is_err());
}

#[test]
fn test_error_messages_name_the_problem() {
    let err = VocBox::new(-3, 0, 10, 10).unwrap_err();
    assert!(err.to_string().contains("Invalid geometry"));
    assert!(err.to_string().contains("-3"));
}

// ============================================================================
// CATEGORY AND IMAGE LOOKUP
// ============================================================================

#[test]
fn test_unknown_category_lookup() {
    let catalog = CategoryCatalog::new(["cat", "dog"]).unwrap();
    assert!(matches!(catalog.id("horse"), Err(VocEvalError::UnknownCategory(_))));
    assert!(matches!(catalog.name(2), Err(VocEvalError::UnknownCategory(_))));
    assert!(catalog.one_hot(2).is_err());
}

#[test]
fn test_empty_or_duplicate_catalog() {
    assert!(CategoryCatalog::new(Vec::<String>::new()).is_err());
    assert!(CategoryCatalog::new(["cat", "cat"]).is_err());
}

#[test]
fn test_ground_truth_with_wrong_category_name() {
    let index = GroundTruthIndex::from_objects(vec![(
        "img",
        vec![GroundTruthObject::new(shape(0, 0, 9, 9), 0, false, "dog")],
    )]);
    let result = Evaluator::new(CategoryCatalog::new(["cat", "dog"]).unwrap(), index);
    assert!(matches!(result, Err(VocEvalError::UnknownCategory(_))));
}

#[test]
fn test_detection_for_unknown_image() {
    let detections = vec![NamedCategoryDetection {
        image_id: "missing".to_string(),
        shape: shape(0, 0, 9, 9),
        score: 0.9,
    }];
    let result = evaluator().average_precision(&detections, 0, 0.5);
    assert!(matches!(result, Err(VocEvalError::UnknownImage(_))));

    let result = evaluator().image_score("missing", &[]);
    assert!(matches!(result, Err(VocEvalError::UnknownImage(_))));
}

// ============================================================================
// SIZE MISMATCHES
// ============================================================================

#[test]
fn test_flatten_unequal_lengths() {
    let result = evaluator().flatten(&["img", "other"], &[vec![]]);
    assert!(matches!(result, Err(VocEvalError::MismatchedSize(_))));
}

#[test]
fn test_flatten_wrong_score_count() {
    let detections = vec![vec![Detection::new(shape(0, 0, 9, 9), vec![0.5, 0.2, 0.1])]];
    let result = evaluator().flatten(&["img"], &detections);
    assert!(matches!(result, Err(VocEvalError::MismatchedSize(_))));
}

#[test]
fn test_rank_images_unequal_lengths() {
    let result = evaluator().rank_images(&["img"], &[]);
    assert!(matches!(result, Err(VocEvalError::MismatchedSize(_))));
}

#[test]
fn test_nms_mixed_category_counts() {
    let detections = vec![
        Detection::new(shape(0, 0, 9, 9), vec![0.9]),
        Detection::new(shape(0, 0, 9, 9), vec![0.9, 0.1]),
    ];
    let result = non_maximal_suppression(&detections, 0.5);
    assert!(matches!(result, Err(VocEvalError::MismatchedSize(_))));
}

#[test]
fn test_decode_wrong_buffer_length() {
    let settings = DetectionSettings::new(2, 1, 7);
    let codec = GridCodec::new(&settings).unwrap();
    let result = codec.decode(&vec![0.0; 10], 448, 448);
    assert!(matches!(result, Err(VocEvalError::MismatchedSize(_))));

    let result = codec.decode_target(&vec![0.0; 10], 448, 448);
    assert!(matches!(result, Err(VocEvalError::MismatchedSize(_))));
}

#[test]
fn test_encode_wrong_score_count() {
    let settings = DetectionSettings::new(2, 1, 7);
    let codec = GridCodec::new(&settings).unwrap();
    let detections = vec![Detection::new(shape(10, 10, 50, 50), vec![1.0])];
    let result = codec.encode(&detections, 448, 448);
    assert!(matches!(result, Err(VocEvalError::MismatchedSize(_))));
}

// ============================================================================
// MISSING SHAPE CALCULATOR
// ============================================================================

#[test]
fn test_encode_mask_without_calculator() {
    let mut settings = DetectionSettings::new(1, 1, 7);
    settings.params_per_shape_encoding = 8;
    let codec = GridCodec::new(&settings).unwrap();

    let masked = Shape::with_mask(VocBox::new(10, 10, 50, 50).unwrap(), Mask::zeros((40, 40)));
    let detections = vec![Detection::new(masked, vec![1.0])];
    let result = codec.encode(&detections, 448, 448);
    assert!(matches!(result, Err(VocEvalError::MissingCollaborator(_))));
}

#[test]
fn test_decode_target_without_calculator() {
    let mut settings = DetectionSettings::new(1, 1, 2);
    settings.params_per_shape_encoding = 2;
    let codec = GridCodec::new(&settings).unwrap();

    let layout = settings.layout();
    let mut target = vec![0.0; layout.target_len()];
    target[0] = 1.0;
    target[1] = 1.0;
    target[2..6].copy_from_slice(&[0.5, 0.5, 0.5, 0.5]);

    let result = codec.decode_target(&target, 100, 100);
    assert!(matches!(result, Err(VocEvalError::MissingCollaborator(_))));
}

// ============================================================================
// THRESHOLDS AND SETTINGS
// ============================================================================

#[test]
fn test_invalid_thresholds() {
    assert!(matches!(prune(&[], 1.5), Err(VocEvalError::InvalidThreshold(_))));
    assert!(matches!(prune(&[], -0.1), Err(VocEvalError::InvalidThreshold(_))));
    assert!(non_maximal_suppression(&[], f32::NAN).is_err());
    assert!(evaluator().average_precision(&[], 0, 2.0).is_err());
    assert!(evaluator().map(&[vec![], vec![]], -1.0).is_err());
}

#[test]
fn test_invalid_threshold_ranges() {
    assert!(overlap_threshold_range(0.9, 0.5, 0.05).is_err());
    assert!(overlap_threshold_range(0.5, 0.95, 0.0).is_err());
    assert!(overlap_threshold_range(0.5, 1.5, 0.1).is_err());
}

#[test]
fn test_invalid_settings_json() {
    assert!(matches!(load_from_str("{ invalid json"), Err(VocEvalError::JsonError(_))));

    let missing_field = r#"{ "category_count": 2, "boxes_per_cell": 1 }"#;
    assert!(matches!(load_from_str(missing_field), Err(VocEvalError::JsonError(_))));

    let zero_grid = r#"{
        "category_count": 2,
        "boxes_per_cell": 1,
        "grid_side_length": 0,
        "detection_threshold": 0.2
    }"#;
    assert!(matches!(load_from_str(zero_grid), Err(VocEvalError::InvalidSettings(_))));
}

#[test]
fn test_codec_rejects_invalid_settings() {
    let mut settings = DetectionSettings::new(2, 1, 7);
    settings.boxes_per_cell = 0;
    assert!(matches!(GridCodec::new(&settings), Err(VocEvalError::InvalidSettings(_))));
}

#[test]
fn test_queue_zero_capacity() {
    assert!(matches!(
        BoundedQueue::<Vec<Detection>>::new(0),
        Err(VocEvalError::InvalidSettings(_))
    ));
}
