//! Evaluation of detections against ground truth: AP, mAP, mAP volume and per-image scores.

use std::cmp::Ordering;
use std::collections::HashSet;

use rayon::prelude::*;
use tracing::debug;

use crate::category::CategoryCatalog;
use crate::error::{Result, VocEvalError};
use crate::ground_truth::GroundTruthIndex;
use crate::matching::{best_ground_truth, match_category, positive_count};
use crate::metrics::ap::{calculate_ap, calculate_map, calculate_map_volume};
use crate::metrics::f1_score::{calculate_f1_score, calculate_image_score};
use crate::metrics::precision_recall::{calculate_precision_recall, calculate_precision_recall_curve};
use crate::threshold::validate_threshold;
use crate::types::{CategoryAp, Detection, ImageScore, MapReport, MapVolumeReport, NamedCategoryDetection};

/// Scores at or below this value are not treated as detections.
pub const DEFAULT_MIN_DETECTION_SCORE: f32 = 1e-5;

/// Best-category score a detection needs to take part in an image score.
pub const IMAGE_SCORE_DETECTION_THRESHOLD: f32 = 0.2;

/// Overlap a detection needs to match an object in an image score.
pub const IMAGE_SCORE_OVERLAP_THRESHOLD: f32 = 0.5;

/// Evaluates detections of a fixed category set against indexed ground truth.
///
/// # Example
///
/// ```
/// use voc_eval::category::CategoryCatalog;
/// use voc_eval::evaluator::Evaluator;
/// use voc_eval::geometry::VocBox;
/// use voc_eval::ground_truth::GroundTruthIndex;
/// use voc_eval::shape::Shape;
/// use voc_eval::types::{Detection, GroundTruthObject};
///
/// let catalog = CategoryCatalog::new(["cat", "dog"]).unwrap();
/// let cat = GroundTruthObject::new(Shape::new(VocBox::new(10, 10, 50, 50).unwrap()), 0, false, "cat");
/// let ground_truth = GroundTruthIndex::from_objects(vec![("img", vec![cat])]);
/// let evaluator = Evaluator::new(catalog, ground_truth).unwrap();
///
/// let detections = vec![vec![
///     Detection::new(Shape::new(VocBox::new(10, 10, 50, 50).unwrap()), vec![0.9, 0.0]),
///     Detection::new(Shape::new(VocBox::new(200, 200, 210, 210).unwrap()), vec![0.8, 0.0]),
/// ]];
/// let per_category = evaluator.flatten(&["img"], &detections).unwrap();
/// let report = evaluator.map(&per_category, 0.5).unwrap();
/// assert!((report.ap_per_category[0].ap - 1.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct Evaluator {
    catalog: CategoryCatalog,
    ground_truth: GroundTruthIndex,
    binary_threshold: Option<u8>,
    min_detection_score: f32,
}

impl Evaluator {
    /// Create an evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`VocEvalError::UnknownCategory`] if the ground truth refers to a category
    /// outside the catalog.
    pub fn new(catalog: CategoryCatalog, ground_truth: GroundTruthIndex) -> Result<Self> {
        ground_truth.validate(&catalog)?;
        Ok(Self {
            catalog,
            ground_truth,
            binary_threshold: None,
            min_detection_score: DEFAULT_MIN_DETECTION_SCORE,
        })
    }

    /// Binarise resized masks at `threshold` before counting pixels.
    #[must_use]
    pub fn with_binary_threshold(mut self, threshold: Option<u8>) -> Self {
        self.binary_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_min_detection_score(mut self, score: f32) -> Self {
        self.min_detection_score = score;
        self
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn ground_truth(&self) -> &GroundTruthIndex {
        &self.ground_truth
    }

    /// Split per-image detections into one list per category.
    ///
    /// A detection contributes to every category whose active score exceeds the minimum
    /// detection score; suppressed scores never contribute.
    ///
    /// # Errors
    ///
    /// Returns [`VocEvalError::MismatchedSize`] if `image_ids` and `detections` differ in
    /// length or a detection's score vector does not match the catalog size.
    pub fn flatten<S: AsRef<str>>(
        &self,
        image_ids: &[S],
        detections: &[Vec<Detection>],
    ) -> Result<Vec<Vec<NamedCategoryDetection>>> {
        if image_ids.len() != detections.len() {
            return Err(VocEvalError::MismatchedSize(format!(
                "{} image ids for {} detection lists",
                image_ids.len(),
                detections.len()
            )));
        }

        let category_count = self.catalog.len();
        let mut per_category: Vec<Vec<NamedCategoryDetection>> = vec![Vec::new(); category_count];

        for (image_id, image_detections) in image_ids.iter().zip(detections) {
            for detection in image_detections {
                if detection.category_count() != category_count {
                    return Err(VocEvalError::MismatchedSize(format!(
                        "detection in image '{}' has {} category scores, catalog has {}",
                        image_id.as_ref(),
                        detection.category_count(),
                        category_count
                    )));
                }

                for (category, score) in detection.scores().iter().enumerate() {
                    match score {
                        Some(score) if *score > self.min_detection_score => {
                            per_category[category].push(NamedCategoryDetection {
                                image_id: image_id.as_ref().to_string(),
                                shape: detection.shape().clone(),
                                score: *score,
                            });
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(per_category)
    }

    /// Average precision of one category.
    ///
    /// # Errors
    ///
    /// * [`VocEvalError::InvalidThreshold`] if `overlap_threshold` is outside [0.0, 1.0].
    /// * [`VocEvalError::UnknownCategory`] if `category` is not in the catalog.
    /// * [`VocEvalError::UnknownImage`] if a detection refers to an image without ground truth.
    pub fn average_precision(
        &self,
        detections: &[NamedCategoryDetection],
        category: usize,
        overlap_threshold: f32,
    ) -> Result<f64> {
        validate_threshold(overlap_threshold)?;
        let name = self.catalog.name(category)?;

        let matches = match_category(
            detections,
            &self.ground_truth,
            category,
            overlap_threshold,
            self.binary_threshold,
        )?;
        let positives = positive_count(detections, &self.ground_truth, category)?;

        let outcomes: Vec<_> = matches.iter().map(|m| m.outcome).collect();
        let curve = calculate_precision_recall_curve(&outcomes, positives);
        let ap = calculate_ap(&curve);

        debug!(
            category = name,
            detections = detections.len(),
            positives,
            overlap_threshold,
            ap,
            "average precision"
        );

        Ok(ap)
    }

    /// Average precision of every category, computed in parallel.
    ///
    /// `per_category[c]` holds the detections of category `c`, as produced by
    /// [`Evaluator::flatten`].
    pub fn ap_per_category(
        &self,
        per_category: &[Vec<NamedCategoryDetection>],
        overlap_threshold: f32,
    ) -> Result<Vec<f64>> {
        if per_category.len() != self.catalog.len() {
            return Err(VocEvalError::MismatchedSize(format!(
                "{} detection lists for {} categories",
                per_category.len(),
                self.catalog.len()
            )));
        }

        per_category
            .par_iter()
            .enumerate()
            .map(|(category, detections)| self.average_precision(detections, category, overlap_threshold))
            .collect()
    }

    /// Per-category AP table and mAP at one overlap threshold.
    pub fn map(
        &self,
        per_category: &[Vec<NamedCategoryDetection>],
        overlap_threshold: f32,
    ) -> Result<MapReport> {
        let aps = self.ap_per_category(per_category, overlap_threshold)?;
        let map = calculate_map(&aps);

        debug!(overlap_threshold, map, "mean average precision");

        Ok(MapReport {
            overlap_threshold: f64::from(overlap_threshold),
            ap_per_category: self
                .catalog
                .names()
                .iter()
                .zip(aps)
                .map(|(category, ap)| CategoryAp {
                    category: category.clone(),
                    ap,
                })
                .collect(),
            map,
        })
    }

    /// mAP at each overlap threshold and their mean.
    ///
    /// # Errors
    ///
    /// Returns [`VocEvalError::InvalidThreshold`] for an empty threshold list.
    pub fn map_volume(
        &self,
        per_category: &[Vec<NamedCategoryDetection>],
        overlap_thresholds: &[f32],
    ) -> Result<MapVolumeReport> {
        if overlap_thresholds.is_empty() {
            return Err(VocEvalError::InvalidThreshold(
                "mAP volume needs at least one overlap threshold".to_string(),
            ));
        }

        let per_threshold = overlap_thresholds
            .iter()
            .map(|&threshold| self.map(per_category, threshold))
            .collect::<Result<Vec<_>>>()?;
        let maps: Vec<f64> = per_threshold.iter().map(|report| report.map).collect();
        let map_volume = calculate_map_volume(&maps);

        debug!(thresholds = overlap_thresholds.len(), map_volume, "mAP volume");

        Ok(MapVolumeReport {
            per_threshold,
            map_volume,
        })
    }

    /// Quality score of the detections in one image.
    ///
    /// Each detection takes part with its best category when that score reaches
    /// [`IMAGE_SCORE_DETECTION_THRESHOLD`]. A match at [`IMAGE_SCORE_OVERLAP_THRESHOLD`]
    /// adds its overlap to the true positives; unmatched and duplicate detections add one
    /// false positive; difficult objects are ignored. Recall is measured against every
    /// object in the image.
    pub fn image_score(&self, image_id: &str, detections: &[Detection]) -> Result<ImageScore> {
        let objects = self.ground_truth.objects(image_id)?;

        let mut true_positives = 0.0f64;
        let mut false_positives = 0.0f64;
        let mut claimed: HashSet<usize> = HashSet::new();

        for detection in detections {
            let Some((category, score)) = detection.best() else {
                continue;
            };
            if score < IMAGE_SCORE_DETECTION_THRESHOLD {
                continue;
            }

            match best_ground_truth(detection.shape(), objects, category, self.binary_threshold)? {
                Some((index, overlap)) if overlap >= IMAGE_SCORE_OVERLAP_THRESHOLD => {
                    if objects[index].difficult {
                        continue;
                    }
                    if claimed.insert(index) {
                        true_positives += f64::from(overlap);
                    } else {
                        false_positives += 1.0;
                    }
                }
                _ => false_positives += 1.0,
            }
        }

        let (precision, recall) = calculate_precision_recall(true_positives, false_positives, objects.len());
        let f1 = calculate_f1_score(precision, recall);

        Ok(ImageScore {
            image_id: image_id.to_string(),
            true_positives,
            false_positives,
            object_count: objects.len(),
            detection_count: detections.len(),
            precision,
            recall,
            f1,
            score: calculate_image_score(f1, true_positives),
        })
    }

    /// Score every image and sort from best to worst.
    pub fn rank_images<S: AsRef<str> + Sync>(
        &self,
        image_ids: &[S],
        detections: &[Vec<Detection>],
    ) -> Result<Vec<ImageScore>> {
        if image_ids.len() != detections.len() {
            return Err(VocEvalError::MismatchedSize(format!(
                "{} image ids for {} detection lists",
                image_ids.len(),
                detections.len()
            )));
        }

        let mut scores = image_ids
            .par_iter()
            .zip(detections.par_iter())
            .map(|(image_id, image_detections)| self.image_score(image_id.as_ref(), image_detections))
            .collect::<Result<Vec<_>>>()?;

        scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::VocBox;
    use crate::shape::Shape;
    use crate::types::GroundTruthObject;

    fn shape(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Shape {
        Shape::new(VocBox::new(xmin, ymin, xmax, ymax).unwrap())
    }

    fn evaluator(objects: Vec<(&str, Vec<GroundTruthObject>)>) -> Evaluator {
        let catalog = CategoryCatalog::new(["cat", "dog"]).unwrap();
        Evaluator::new(catalog, GroundTruthIndex::from_objects(objects)).unwrap()
    }

    fn cat(s: Shape) -> GroundTruthObject {
        GroundTruthObject::new(s, 0, false, "cat")
    }

    #[test]
    fn test_flatten_splits_categories() {
        let eval = evaluator(vec![("img", vec![])]);
        let mut suppressed = Detection::new(shape(0, 0, 9, 9), vec![0.7, 0.6]);
        suppressed.suppress(1);
        let detections = vec![vec![
            Detection::new(shape(0, 0, 9, 9), vec![0.9, 0.3]),
            Detection::new(shape(0, 0, 9, 9), vec![0.0, 1e-6]),
            suppressed,
        ]];

        let per_category = eval.flatten(&["img"], &detections).unwrap();
        assert_eq!(per_category.len(), 2);
        assert_eq!(per_category[0].len(), 2);
        assert_eq!(per_category[1].len(), 1);
        assert_eq!(per_category[1][0].score, 0.3);
    }

    #[test]
    fn test_flatten_size_checks() {
        let eval = evaluator(vec![("img", vec![])]);
        let result = eval.flatten(&["a", "b"], &[vec![]]);
        assert!(matches!(result, Err(VocEvalError::MismatchedSize(_))));

        let wrong = vec![vec![Detection::new(shape(0, 0, 9, 9), vec![0.9])]];
        assert!(matches!(eval.flatten(&["img"], &wrong), Err(VocEvalError::MismatchedSize(_))));
    }

    #[test]
    fn test_average_precision_no_detections() {
        let eval = evaluator(vec![("img", vec![cat(shape(10, 10, 50, 50))])]);
        assert_eq!(eval.average_precision(&[], 0, 0.5).unwrap(), 0.0);
    }

    #[test]
    fn test_average_precision_unknown_category() {
        let eval = evaluator(vec![("img", vec![])]);
        assert!(matches!(
            eval.average_precision(&[], 5, 0.5),
            Err(VocEvalError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_ap_per_category_size_check() {
        let eval = evaluator(vec![("img", vec![])]);
        assert!(matches!(
            eval.ap_per_category(&[vec![]], 0.5),
            Err(VocEvalError::MismatchedSize(_))
        ));
    }

    #[test]
    fn test_map_volume_rejects_empty_thresholds() {
        let eval = evaluator(vec![("img", vec![])]);
        assert!(eval.map_volume(&[vec![], vec![]], &[]).is_err());
    }

    #[test]
    fn test_new_rejects_unknown_category() {
        let catalog = CategoryCatalog::new(["cat"]).unwrap();
        let gt = GroundTruthIndex::from_objects(vec![(
            "img",
            vec![GroundTruthObject::new(shape(0, 0, 9, 9), 3, false, "")],
        )]);
        assert!(Evaluator::new(catalog, gt).is_err());
    }

    #[test]
    fn test_image_score_weights_true_positives_by_overlap() {
        let eval = evaluator(vec![("img", vec![cat(shape(0, 0, 9, 9)), cat(shape(100, 100, 109, 109))])]);
        let detections = vec![
            // Exact match: overlap 1.
            Detection::new(shape(0, 0, 9, 9), vec![0.9, 0.0]),
            // Duplicate of the first object.
            Detection::new(shape(0, 0, 9, 9), vec![0.8, 0.0]),
            // Below the detection threshold, ignored.
            Detection::new(shape(100, 100, 109, 109), vec![0.1, 0.0]),
        ];

        let score = eval.image_score("img", &detections).unwrap();
        assert!((score.true_positives - 1.0).abs() < 1e-6);
        assert!((score.false_positives - 1.0).abs() < 1e-10);
        assert_eq!(score.object_count, 2);
        assert_eq!(score.detection_count, 3);
        assert!((score.precision - 0.5).abs() < 1e-6);
        assert!((score.recall - 0.5).abs() < 1e-6);
        assert!((score.f1 - 0.5).abs() < 1e-6);
        assert!((score.score - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_image_score_without_detections() {
        let eval = evaluator(vec![("img", vec![cat(shape(0, 0, 9, 9))])]);
        let score = eval.image_score("img", &[]).unwrap();
        assert_eq!(score.f1, 0.0);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_rank_images_best_first() {
        let eval = evaluator(vec![
            ("good", vec![cat(shape(0, 0, 9, 9))]),
            ("bad", vec![cat(shape(0, 0, 9, 9))]),
        ]);
        let detections = vec![
            vec![Detection::new(shape(50, 50, 59, 59), vec![0.9, 0.0])],
            vec![Detection::new(shape(0, 0, 9, 9), vec![0.9, 0.0])],
        ];

        let ranked = eval.rank_images(&["bad", "good"], &detections).unwrap();
        assert_eq!(ranked[0].image_id, "good");
        assert_eq!(ranked[1].image_id, "bad");
    }
}
