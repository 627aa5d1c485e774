//! Mapping between flat grid buffers and lists of detections.
//!
//! Two buffer formats share the grid geometry described by [`GridLayout`]:
//!
//! * the prediction buffer produced by the network, read by [`GridCodec::decode`];
//! * the training target, written by [`GridCodec::encode`] and read back by
//!   [`GridCodec::decode_target`].

use tracing::{debug, trace, warn};

use crate::error::{Result, VocEvalError};
use crate::geometry::{BoundingBox, VocBox};
use crate::settings::{DetectionSettings, GridLayout};
use crate::shape::{Shape, ShapeDescriptorCalculator};
use crate::stats::DecodeStats;
use crate::types::Detection;

/// Encoder and decoder for one detector configuration.
///
/// # Example
///
/// ```
/// use voc_eval::codec::GridCodec;
/// use voc_eval::settings::DetectionSettings;
///
/// let settings = DetectionSettings::new(2, 1, 2);
/// let codec = GridCodec::new(&settings).unwrap();
///
/// let buffer = vec![0.0; settings.layout().prediction_len()];
/// let detections = codec.decode(&buffer, 100, 100).unwrap();
/// assert_eq!(detections.len(), 4);
/// ```
pub struct GridCodec<'a> {
    settings: &'a DetectionSettings,
    layout: GridLayout,
    calculator: Option<&'a dyn ShapeDescriptorCalculator>,
}

impl<'a> GridCodec<'a> {
    /// Create a codec without a shape descriptor calculator.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail validation.
    pub fn new(settings: &'a DetectionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            layout: settings.layout(),
            calculator: None,
        })
    }

    /// Attach the calculator used for shape encodings.
    #[must_use]
    pub fn with_calculator(mut self, calculator: &'a dyn ShapeDescriptorCalculator) -> Self {
        self.calculator = Some(calculator);
        self
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    fn calculator(&self) -> Result<&'a dyn ShapeDescriptorCalculator> {
        self.calculator.ok_or_else(|| {
            VocEvalError::MissingCollaborator(format!(
                "{} shape parameters configured but no shape descriptor calculator supplied",
                self.settings.params_per_shape_encoding
            ))
        })
    }

    /// Decode a prediction buffer into one detection per grid slot.
    ///
    /// Detections are returned in slot order (`cell * boxes_per_cell + slot`). Slots with a
    /// NaN confidence or a box that does not survive clipping become zero-score detections
    /// on a `(0, 0, 0, 0)` box.
    ///
    /// # Errors
    ///
    /// * [`VocEvalError::MismatchedSize`] if the buffer length does not match the layout.
    /// * [`VocEvalError::MissingCollaborator`] if a shape must be decoded and no calculator
    ///   was attached.
    pub fn decode(
        &self,
        buffer: &[f32],
        image_width: usize,
        image_height: usize,
    ) -> Result<Vec<Detection>> {
        self.decode_with_stats(buffer, image_width, image_height)
            .map(|(detections, _)| detections)
    }

    /// Same as [`GridCodec::decode`], also returning per-call counters.
    pub fn decode_with_stats(
        &self,
        buffer: &[f32],
        image_width: usize,
        image_height: usize,
    ) -> Result<(Vec<Detection>, DecodeStats)> {
        let expected = self.layout.prediction_len();
        if buffer.len() != expected {
            return Err(VocEvalError::MismatchedSize(format!(
                "prediction buffer has {} values, layout expects {}",
                buffer.len(),
                expected
            )));
        }

        let mut stats = DecodeStats::new();
        let mut detections =
            Vec::with_capacity(self.layout.cell_count() * self.settings.boxes_per_cell);

        for cell in 0..self.layout.cell_count() {
            for slot in 0..self.settings.boxes_per_cell {
                stats.add_slot();
                let detection =
                    self.decode_slot(buffer, cell, slot, image_width, image_height, &mut stats)?;
                detections.push(detection);
            }
        }

        if stats.nan_confidences > 0 {
            warn!(
                nan_confidences = stats.nan_confidences,
                "prediction buffer contains NaN confidences"
            );
        }
        debug!(%stats, "decoded prediction buffer");

        Ok((detections, stats))
    }

    fn decode_slot(
        &self,
        buffer: &[f32],
        cell: usize,
        slot: usize,
        image_width: usize,
        image_height: usize,
        stats: &mut DecodeStats,
    ) -> Result<Detection> {
        let category_count = self.settings.category_count;

        let confidence = buffer[self.layout.confidence_index(cell, slot)];
        if confidence.is_nan() {
            trace!(cell, slot, "NaN confidence");
            stats.record_nan_confidence();
            return Ok(Detection::degenerate(category_count));
        }

        let voc_box = self.decode_box(buffer, cell, slot, image_width, image_height);
        if !voc_box.is_valid() {
            trace!(cell, slot, "box outside image");
            stats.record_invalid_box();
            return Ok(Detection::degenerate(category_count));
        }

        let threshold = self.settings.detection_threshold;
        let mut max_confidence = 0.0f32;
        let mut scores = Vec::with_capacity(category_count);
        for category in 0..category_count {
            let probability = confidence * buffer[self.layout.class_index(cell, category)];
            let score = if probability >= threshold { probability } else { 0.0 };
            max_confidence = max_confidence.max(score);
            scores.push(score);
        }
        if max_confidence >= threshold && max_confidence > 0.0 {
            stats.record_above_threshold();
        }

        let shape_params = self.settings.params_per_shape_encoding;
        let shape = if shape_params > 0 && max_confidence >= threshold {
            let start = self.layout.shape_index(cell, slot);
            let mask = self.calculator()?.to_mask(
                &buffer[start..start + shape_params],
                voc_box.w() as usize,
                voc_box.h() as usize,
            )?;
            stats.record_shape_decode();
            Shape::with_mask(voc_box, mask)
        } else {
            Shape::new(voc_box)
        };

        if self.settings.only_objectness {
            scores[0] = confidence;
        }

        Ok(Detection::new(shape, scores))
    }

    fn decode_box(
        &self,
        buffer: &[f32],
        cell: usize,
        slot: usize,
        image_width: usize,
        image_height: usize,
    ) -> VocBox {
        let (row, col) = self.layout.cell_position(cell);
        let side = self.layout.side() as f32;
        let (width, height) = (image_width as f32, image_height as f32);

        let index = self.layout.box_index(cell, slot);
        let params = &buffer[index..index + self.settings.params_per_box];
        let (rel_x, rel_y, raw_w, raw_h) = (params[0], params[1], params[2], params[3]);

        let x = ((rel_x + col as f32) / side) * width;
        let y = ((rel_y + row as f32) / side) * height;
        let w = self.unsquare(raw_w) * width;
        let h = self.unsquare(raw_h) * height;

        match BoundingBox::new(non_negative(x), non_negative(y), non_negative(w), non_negative(h)) {
            Ok(b) => VocBox::from(b).clip_to_image_boundaries(image_width as i32, image_height as i32),
            Err(_) => VocBox::INVALID,
        }
    }

    fn unsquare(&self, value: f32) -> f32 {
        if self.settings.use_square {
            value * value
        } else {
            value
        }
    }

    /// Write ground-truth detections into a training target.
    ///
    /// Each detection is assigned to the cell containing its box center. A cell holds at
    /// most one object: a detection landing in an occupied cell is dropped. Boxes that do
    /// not survive clipping to the image are skipped.
    ///
    /// Suppressed category scores are written as zero probability mass.
    ///
    /// # Errors
    ///
    /// * [`VocEvalError::MismatchedSize`] if a score vector length differs from the
    ///   category count, or the calculator returns an encoding of the wrong length.
    /// * [`VocEvalError::MissingCollaborator`] if a mask must be encoded and no
    ///   calculator was attached.
    pub fn encode(
        &self,
        detections: &[Detection],
        image_width: usize,
        image_height: usize,
    ) -> Result<Vec<f32>> {
        let category_count = self.settings.category_count;
        let shape_params = self.settings.params_per_shape_encoding;
        let side = self.layout.side();
        let mut target = vec![0.0f32; self.layout.target_len()];
        let mut dropped = 0usize;

        for detection in detections {
            if detection.category_count() != category_count {
                return Err(VocEvalError::MismatchedSize(format!(
                    "detection has {} category scores, settings expect {}",
                    detection.category_count(),
                    category_count
                )));
            }

            let voc_box = detection
                .voc_box()
                .clip_to_image_boundaries(image_width as i32, image_height as i32);
            if !voc_box.is_valid() {
                continue;
            }

            let normalized =
                BoundingBox::from(voc_box).scale(1.0 / image_width as f32, 1.0 / image_height as f32);
            let grid_x = normalized.x() * side as f32;
            let grid_y = normalized.y() * side as f32;
            let col = (grid_x as usize).min(side - 1);
            let row = (grid_y as usize).min(side - 1);

            let mut index = self.layout.target_cell_index(row * side + col);
            if target[index] > f32::MIN_POSITIVE {
                dropped += 1;
                continue;
            }

            target[index] = 1.0;
            index += 1;
            for (value, score) in target[index..index + category_count]
                .iter_mut()
                .zip(detection.scores())
            {
                *value = score.unwrap_or(0.0);
            }
            index += category_count;

            let (w, h) = if self.settings.use_square {
                (normalized.w().sqrt(), normalized.h().sqrt())
            } else {
                (normalized.w(), normalized.h())
            };
            target[index..index + 4].copy_from_slice(&[
                grid_x - col as f32,
                grid_y - row as f32,
                w,
                h,
            ]);
            index += self.settings.params_per_box;

            if shape_params > 0 {
                if let Some(mask) = detection.shape().mask() {
                    let encoding = self.calculator()?.from_mask(mask, shape_params)?;
                    if encoding.len() != shape_params {
                        return Err(VocEvalError::MismatchedSize(format!(
                            "shape encoding has {} values, settings expect {}",
                            encoding.len(),
                            shape_params
                        )));
                    }
                    target[index..index + shape_params].copy_from_slice(&encoding);
                }
            }
        }

        debug!(
            detections = detections.len(),
            dropped_occupied_cells = dropped,
            "encoded training target"
        );

        Ok(target)
    }

    /// Read detections back from a training target.
    ///
    /// A cell yields a detection when the largest value of its probability mass is at
    /// least the detection threshold; the detection carries the full mass vector.
    ///
    /// # Errors
    ///
    /// * [`VocEvalError::MismatchedSize`] if the target length does not match the layout.
    /// * [`VocEvalError::InvalidGeometry`] if a stored box has negative extents.
    /// * [`VocEvalError::MissingCollaborator`] if shape parameters are configured and no
    ///   calculator was attached.
    pub fn decode_target(
        &self,
        target: &[f32],
        image_width: usize,
        image_height: usize,
    ) -> Result<Vec<Detection>> {
        let expected = self.layout.target_len();
        if target.len() != expected {
            return Err(VocEvalError::MismatchedSize(format!(
                "training target has {} values, layout expects {}",
                target.len(),
                expected
            )));
        }

        let category_count = self.settings.category_count;
        let shape_params = self.settings.params_per_shape_encoding;
        let side = self.layout.side() as f32;
        let mut detections = Vec::new();

        for cell in 0..self.layout.cell_count() {
            let mut index = self.layout.target_cell_index(cell) + self.settings.params_per_confidence_score;
            let pmf = &target[index..index + category_count];
            index += category_count;

            let best = pmf
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            if best < self.settings.detection_threshold {
                continue;
            }

            let (row, col) = self.layout.cell_position(cell);
            let params = &target[index..index + self.settings.params_per_box];
            index += self.settings.params_per_box;

            let x = (params[0] + col as f32) / side * image_width as f32;
            let y = (params[1] + row as f32) / side * image_height as f32;
            let w = self.unsquare(params[2]) * image_width as f32;
            let h = self.unsquare(params[3]) * image_height as f32;
            let voc_box = VocBox::from(BoundingBox::new(x, y, w, h)?);

            let shape = if shape_params > 0 {
                let mask = self.calculator()?.to_mask(
                    &target[index..index + shape_params],
                    voc_box.w() as usize,
                    voc_box.h() as usize,
                )?;
                Shape::with_mask(voc_box, mask)
            } else {
                Shape::new(voc_box)
            };

            detections.push(Detection::new(shape, pmf.to_vec()));
        }

        Ok(detections)
    }
}

fn non_negative(value: f32) -> f32 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}
