//! Shapes: a [`VocBox`] with an optional raster mask.
//!
//! Area and intersection fall back to pure box arithmetic when no mask is present.
//! When masks are involved the result is a count of mask pixels, so the unit differs
//! between the two paths.

use fast_image_resize::{
    self as fir,
    images::{Image, ImageRef},
    FilterType, ResizeAlg, ResizeOptions, Resizer,
};
use ndarray::{s, Array2};

use crate::error::{Result, VocEvalError};
use crate::geometry::VocBox;

/// Single-channel raster mask, indexed `[row, col]`.
pub type Mask = Array2<u8>;

/// Converts between pixel masks and fixed-length shape descriptors.
///
/// Backends (binary mask, radial, learned encoders) live outside this crate.
pub trait ShapeDescriptorCalculator: Send + Sync {
    /// Encode a mask into a descriptor of `descriptor_size` values.
    fn from_mask(&self, mask: &Mask, descriptor_size: usize) -> Result<Vec<f32>>;

    /// Decode a descriptor into a `height x width` mask.
    fn to_mask(&self, descriptor: &[f32], width: usize, height: usize) -> Result<Mask>;
}

/// A box plus an optional mask covering the box's pixel rectangle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    voc_box: VocBox,
    mask: Option<Mask>,
}

impl Shape {
    pub fn new(voc_box: VocBox) -> Self {
        Self {
            voc_box,
            mask: None,
        }
    }

    pub fn with_mask(voc_box: VocBox, mask: Mask) -> Self {
        Self {
            voc_box,
            mask: Some(mask),
        }
    }

    pub fn voc_box(&self) -> VocBox {
        self.voc_box
    }

    pub fn mask(&self) -> Option<&Mask> {
        self.mask.as_ref()
    }

    /// Area of the shape.
    ///
    /// Without a mask this is the inclusive box area. With a mask, the mask is resized
    /// onto the box's pixel rectangle, drawn additively on a zero canvas and the
    /// non-zero pixels are counted. `binary_threshold` binarises the resized mask first;
    /// `None` keeps the raw values.
    pub fn area(&self, binary_threshold: Option<u8>) -> Result<f32> {
        let Some(mask) = &self.mask else {
            return Ok(self.voc_box.area() as f32);
        };
        if !has_pixel_rect(&self.voc_box) {
            return Ok(self.voc_box.area() as f32);
        }

        let canvas = draw_on_canvas(
            &self.voc_box,
            Some(mask),
            self.voc_box.xmax() as usize,
            self.voc_box.ymax() as usize,
            binary_threshold,
        )?;
        Ok(count_non_zero(&canvas) as f32)
    }

    /// Intersection area with another shape.
    ///
    /// Returns the box intersection area when it is not positive or when neither shape
    /// carries a mask. Otherwise both shapes are drawn on a shared canvas and the
    /// pixels set in both (bitwise AND) are counted. A shape without a mask is drawn as
    /// its filled rectangle.
    pub fn intersection_area(&self, other: &Shape, binary_threshold: Option<u8>) -> Result<f32> {
        let box_intersection = self.voc_box.intersection_area(&other.voc_box);
        if box_intersection <= 0.0 || (self.mask.is_none() && other.mask.is_none()) {
            return Ok(box_intersection);
        }
        if !has_pixel_rect(&self.voc_box) || !has_pixel_rect(&other.voc_box) {
            return Ok(box_intersection);
        }

        let canvas_width = self.voc_box.xmax().max(other.voc_box.xmax()) as usize;
        let canvas_height = self.voc_box.ymax().max(other.voc_box.ymax()) as usize;

        let canvas_a = draw_on_canvas(
            &self.voc_box,
            self.mask.as_ref(),
            canvas_width,
            canvas_height,
            binary_threshold,
        )?;
        let canvas_b = draw_on_canvas(
            &other.voc_box,
            other.mask.as_ref(),
            canvas_width,
            canvas_height,
            binary_threshold,
        )?;

        let shared = canvas_a
            .iter()
            .zip(canvas_b.iter())
            .filter(|&(&a, &b)| a & b != 0)
            .count();

        Ok(shared as f32)
    }

    /// Shape-aware intersection over union.
    pub fn overlap(&self, other: &Shape, binary_threshold: Option<u8>) -> Result<f32> {
        let intersection = self.intersection_area(other, binary_threshold)?;
        let union =
            self.area(binary_threshold)? + other.area(binary_threshold)? - intersection;
        Ok(intersection / union)
    }
}

/// The pixel rectangle of a box starts at `(xmin, ymin)` and spans
/// `xmax - xmin` by `ymax - ymin` pixels.
fn pixel_rect(voc_box: &VocBox) -> (usize, usize, usize, usize) {
    (
        voc_box.xmin() as usize,
        voc_box.ymin() as usize,
        (voc_box.xmax() - voc_box.xmin()) as usize,
        (voc_box.ymax() - voc_box.ymin()) as usize,
    )
}

fn has_pixel_rect(voc_box: &VocBox) -> bool {
    voc_box.is_valid()
}

fn draw_on_canvas(
    voc_box: &VocBox,
    mask: Option<&Mask>,
    canvas_width: usize,
    canvas_height: usize,
    binary_threshold: Option<u8>,
) -> Result<Mask> {
    let (x, y, width, height) = pixel_rect(voc_box);
    let mut canvas = Mask::zeros((canvas_height, canvas_width));

    let mut resized = match mask {
        Some(mask) => resize_mask(mask, width, height)?,
        None => Mask::from_elem((height, width), u8::MAX),
    };
    if let Some(threshold) = binary_threshold {
        resized.mapv_inplace(|p| if p > threshold { u8::MAX } else { 0 });
    }

    canvas
        .slice_mut(s![y..y + height, x..x + width])
        .zip_mut_with(&resized, |c, &m| {
            if m != 0 {
                *c = c.saturating_add(m);
            }
        });

    Ok(canvas)
}

fn count_non_zero(mask: &Mask) -> usize {
    mask.iter().filter(|&&p| p != 0).count()
}

/// Resize a mask to `height x width` with cubic interpolation.
///
/// Masks already at the requested size are returned unchanged.
pub fn resize_mask(mask: &Mask, width: usize, height: usize) -> Result<Mask> {
    if mask.dim() == (height, width) {
        return Ok(mask.clone());
    }
    if width == 0 || height == 0 || mask.is_empty() {
        return Ok(Mask::zeros((height, width)));
    }

    let src_pixels = mask.as_standard_layout();
    let src_slice = src_pixels
        .as_slice()
        .ok_or_else(|| VocEvalError::MaskResize("mask is not contiguous".to_string()))?;
    let src_image = ImageRef::new(
        mask.ncols() as u32,
        mask.nrows() as u32,
        src_slice,
        fir::PixelType::U8,
    )
    .map_err(|e| VocEvalError::MaskResize(e.to_string()))?;

    let mut dst_image = Image::new(width as u32, height as u32, fir::PixelType::U8);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::CatmullRom));
    Resizer::new()
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| VocEvalError::MaskResize(e.to_string()))?;

    Mask::from_shape_vec((height, width), dst_image.into_vec())
        .map_err(|e| VocEvalError::MaskResize(e.to_string()))
}
