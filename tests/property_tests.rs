//! Property-based tests using proptest
//!
//! These tests verify mathematical properties and invariants that should
//! always hold regardless of the input values.

use std::collections::VecDeque;

use proptest::prelude::*;
use voc_eval::category::CategoryCatalog;
use voc_eval::codec::GridCodec;
use voc_eval::evaluator::Evaluator;
use voc_eval::geometry::VocBox;
use voc_eval::ground_truth::GroundTruthIndex;
use voc_eval::matching::MatchOutcome;
use voc_eval::metrics::{calculate_ap, calculate_f1_score, calculate_precision_recall_curve};
use voc_eval::nms::non_maximal_suppression;
use voc_eval::queue::BoundedQueue;
use voc_eval::settings::DetectionSettings;
use voc_eval::shape::Shape;
use voc_eval::threshold::prune;
use voc_eval::types::{Detection, GroundTruthObject};

fn voc(xmin: i32, ymin: i32, w: i32, h: i32) -> VocBox {
    VocBox::new(xmin, ymin, xmin + w, ymin + h).unwrap()
}

/// A box and a second box whose top-left corner lies inside the first, so the two
/// always share at least one pixel.
fn intersecting_pair() -> impl Strategy<Value = (VocBox, VocBox)> {
    (0i32..100, 0i32..100, 0i32..50, 0i32..50, 0i32..50, 0i32..50, 0i32..50, 0i32..50).prop_map(
        |(x1, y1, w1, h1, ox, oy, w2, h2)| {
            let a = voc(x1, y1, w1, h1);
            let b = voc(x1 + ox % (w1 + 1), y1 + oy % (h1 + 1), w2, h2);
            (a, b)
        },
    )
}

fn outcome() -> impl Strategy<Value = MatchOutcome> {
    prop_oneof![
        Just(MatchOutcome::TruePositive),
        Just(MatchOutcome::FalsePositive),
        Just(MatchOutcome::DontCare),
    ]
}

fn detection() -> impl Strategy<Value = Detection> {
    (0i32..60, 0i32..60, 1i32..40, 1i32..40, prop::collection::vec(0.01f32..1.0, 2)).prop_map(
        |(x, y, w, h, scores)| Detection::new(Shape::new(voc(x, y, w, h)), scores),
    )
}

// Property: overlap of intersecting boxes is symmetric and lies in [0, 1]
proptest! {
    #[test]
    fn prop_overlap_range((a, b) in intersecting_pair()) {
        let ab = a.overlap(&b);
        let ba = b.overlap(&a);

        prop_assert!(a.intersection_area(&b) > 0.0);
        prop_assert!((ab - ba).abs() < 1e-6, "overlap should be symmetric: {} vs {}", ab, ba);
        prop_assert!(ab > 0.0 && ab <= 1.0, "overlap should be in (0,1], got {}", ab);
    }

    #[test]
    fn prop_overlap_identical(x in 0i32..100, y in 0i32..100, w in 0i32..50, h in 0i32..50) {
        let b = voc(x, y, w, h);
        prop_assert!((b.overlap(&b) - 1.0).abs() < 1e-6);
    }
}

// Property: pruning twice at the same threshold changes nothing
proptest! {
    #[test]
    fn prop_prune_idempotent(
        detections in prop::collection::vec(detection(), 0..30),
        threshold in 0.0f32..=1.0,
    ) {
        let once = prune(&detections, threshold).unwrap();
        let twice = prune(&once, threshold).unwrap();
        prop_assert_eq!(once, twice);
    }
}

// Property: after NMS no two active detections of a category overlap beyond the threshold
proptest! {
    #[test]
    fn prop_nms_survivors_do_not_overlap(
        detections in prop::collection::vec(detection(), 0..25),
        threshold in 0.1f32..0.9,
    ) {
        let kept = non_maximal_suppression(&detections, threshold).unwrap();
        prop_assert_eq!(kept.len(), detections.len());

        for category in 0..2 {
            let survivors: Vec<&Detection> = kept
                .iter()
                .filter(|d| d.score(category).is_some())
                .collect();
            for (i, a) in survivors.iter().enumerate() {
                for b in &survivors[i + 1..] {
                    let overlap = a.voc_box().overlap(&b.voc_box());
                    prop_assert!(
                        !(overlap > threshold),
                        "surviving pair overlaps {} > {}", overlap, threshold
                    );
                }
            }
        }
    }
}

// Property: AP stays within [0, 1] and F1 within [0, 1]
proptest! {
    #[test]
    fn prop_ap_range(outcomes in prop::collection::vec(outcome(), 0..50), extra in 0usize..10) {
        let true_positives = outcomes
            .iter()
            .filter(|o| **o == MatchOutcome::TruePositive)
            .count();
        let curve = calculate_precision_recall_curve(&outcomes, true_positives + extra);
        let ap = calculate_ap(&curve);
        prop_assert!((0.0..=1.0 + 1e-10).contains(&ap), "AP should be in [0,1], got {}", ap);
    }

    #[test]
    fn prop_f1_range(precision in 0.0f64..=1.0, recall in 0.0f64..=1.0) {
        let f1 = calculate_f1_score(precision, recall);
        prop_assert!((0.0..=1.0).contains(&f1), "F1 should be in [0,1], got {}", f1);
        prop_assert!(f1 <= precision.max(recall) + 1e-10);
    }
}

// Property: mAP volume is the mean of mAP over the thresholds
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_map_volume_is_mean(
        detections in prop::collection::vec(detection(), 1..15),
        thresholds in prop::collection::vec(0.05f32..0.95, 1..6),
    ) {
        let objects = vec![
            GroundTruthObject::new(Shape::new(voc(10, 10, 20, 20)), 0, false, "cat"),
            GroundTruthObject::new(Shape::new(voc(30, 40, 25, 15)), 1, false, "dog"),
            GroundTruthObject::new(Shape::new(voc(5, 50, 30, 30)), 0, true, "cat"),
        ];
        let catalog = CategoryCatalog::new(["cat", "dog"]).unwrap();
        let evaluator =
            Evaluator::new(catalog, GroundTruthIndex::from_objects(vec![("img", objects)])).unwrap();

        let per_category = evaluator.flatten(&["img"], &[detections]).unwrap();
        let volume = evaluator.map_volume(&per_category, &thresholds).unwrap();

        let mean = thresholds
            .iter()
            .map(|&t| evaluator.map(&per_category, t).unwrap().map)
            .sum::<f64>()
            / thresholds.len() as f64;
        prop_assert!((volume.map_volume - mean).abs() < 1e-10);
    }
}

// Property: encoding a ground-truth box and reading it back keeps category and box
proptest! {
    #[test]
    fn prop_codec_round_trip(
        xmin in 0i32..150,
        ymin in 0i32..150,
        w in 2i32..50,
        h in 2i32..50,
        category in 0usize..3,
    ) {
        let settings = DetectionSettings::new(3, 1, 7);
        let codec = GridCodec::new(&settings).unwrap();
        let original = voc(xmin, ymin, w, h);
        let catalog = CategoryCatalog::new(["cat", "dog", "horse"]).unwrap();
        let detection = Detection::new(Shape::new(original), catalog.one_hot(category).unwrap());

        let target = codec.encode(&[detection], 200, 200).unwrap();
        let restored = codec.decode_target(&target, 200, 200).unwrap();
        prop_assert_eq!(restored.len(), 1);

        let (restored_category, _) = restored[0].best().unwrap();
        prop_assert_eq!(restored_category, category);

        let b = restored[0].voc_box();
        for (got, expected) in [
            (b.xmin(), original.xmin()),
            (b.ymin(), original.ymin()),
            (b.xmax(), original.xmax()),
            (b.ymax(), original.ymax()),
        ] {
            prop_assert!((got - expected).abs() <= 1, "{:?} vs {:?}", b, original);
        }
    }
}

// Property: the queue behaves like a FIFO of capacity - 1 items
proptest! {
    #[test]
    fn prop_queue_matches_fifo_model(
        capacity in 2usize..8,
        ops in prop::collection::vec(any::<Option<u16>>(), 0..100),
    ) {
        let queue = BoundedQueue::new(capacity).unwrap();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Some(value) => {
                    let accepted = queue.push(value).is_ok();
                    prop_assert_eq!(accepted, model.len() < capacity - 1);
                    if accepted {
                        model.push_back(value);
                    }
                }
                None => prop_assert_eq!(queue.pop(), model.pop_front()),
            }
            prop_assert_eq!(queue.len(), model.len());
        }
    }
}
