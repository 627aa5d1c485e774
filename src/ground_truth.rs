//! Ground-truth sources and the per-image index consumed by evaluation.
//!
//! Annotation formats (VOC XML, COCO JSON, segmentation masks) are parsed outside this
//! crate. Each format exposes its images through [`GroundTruthSource`]; evaluation only
//! ever sees the resulting [`GroundTruthObject`] lists.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use crate::category::CategoryCatalog;
use crate::error::{Result, VocEvalError};
use crate::geometry::VocBox;
use crate::shape::Shape;
use crate::types::GroundTruthObject;

/// One annotated image from any annotation format.
pub trait GroundTruthSource: Send + Sync {
    fn image_id(&self) -> &str;

    /// `(width, height)` of the original image in pixels.
    fn image_size(&self) -> (usize, usize);

    /// Objects of the image, optionally mapped through an augmentation transform.
    fn objects(&self, transform: Option<&BoxTransform>) -> Result<Vec<GroundTruthObject>>;
}

/// Box-level augmentation applied to ground truth when building training targets.
///
/// The steps run in order: translate by a fraction of the image size, optionally mirror
/// horizontally, scale to the network input size and clip to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxTransform {
    pub x_translation: f32,
    pub y_translation: f32,
    pub flip: bool,
    pub network_width: usize,
    pub network_height: usize,
}

impl BoxTransform {
    /// Resize-only transform to a network input of the given size.
    pub fn resize_only(network_width: usize, network_height: usize) -> Self {
        Self {
            x_translation: 0.0,
            y_translation: 0.0,
            flip: false,
            network_width,
            network_height,
        }
    }

    /// Map a box from an image of `image_width x image_height` into network space.
    ///
    /// The result is [`VocBox::INVALID`] when the box leaves the network frame.
    pub fn apply(&self, voc_box: VocBox, image_width: usize, image_height: usize) -> VocBox {
        let tx = (self.x_translation * image_width as f32) as i32;
        let ty = (self.y_translation * image_height as f32) as i32;

        let mut result = voc_box.translate(tx, ty);
        if self.flip {
            result = result.flip_vertical(image_width as i32);
        }

        let sx = self.network_width as f32 / image_width as f32;
        let sy = self.network_height as f32 / image_height as f32;
        result
            .scale(sx, sy)
            .clip_to_image_boundaries(self.network_width as i32, self.network_height as i32)
    }
}

/// In-memory annotated image.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedImage {
    pub image_id: String,
    pub width: usize,
    pub height: usize,
    pub objects: Vec<GroundTruthObject>,
}

impl AnnotatedImage {
    pub fn new(image_id: impl Into<String>, width: usize, height: usize, objects: Vec<GroundTruthObject>) -> Self {
        Self {
            image_id: image_id.into(),
            width,
            height,
            objects,
        }
    }
}

impl GroundTruthSource for AnnotatedImage {
    fn image_id(&self) -> &str {
        &self.image_id
    }

    fn image_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Transformed objects carry box-only shapes; masks are not warped.
    fn objects(&self, transform: Option<&BoxTransform>) -> Result<Vec<GroundTruthObject>> {
        let Some(transform) = transform else {
            return Ok(self.objects.clone());
        };

        Ok(self
            .objects
            .iter()
            .map(|object| GroundTruthObject {
                shape: Shape::new(transform.apply(object.shape.voc_box(), self.width, self.height)),
                ..object.clone()
            })
            .collect())
    }
}

/// Ground-truth objects grouped by image id.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthIndex {
    images: HashMap<String, Vec<GroundTruthObject>>,
}

impl GroundTruthIndex {
    /// Load every source in parallel and index the objects by image id.
    ///
    /// Sources sharing an image id are merged.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a source.
    pub fn build<S: GroundTruthSource>(sources: &[S]) -> Result<Self> {
        let loaded = sources
            .par_iter()
            .map(|source| -> Result<(String, Vec<GroundTruthObject>)> {
                Ok((source.image_id().to_string(), source.objects(None)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let index = Self::from_objects(loaded);
        debug!(
            images = index.len(),
            objects = index.images.values().map(Vec::len).sum::<usize>(),
            "built ground-truth index"
        );
        Ok(index)
    }

    /// Index already-loaded objects.
    pub fn from_objects<I, K>(objects: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<GroundTruthObject>)>,
        K: Into<String>,
    {
        let mut images: HashMap<String, Vec<GroundTruthObject>> = HashMap::new();
        for (image_id, image_objects) in objects {
            images.entry(image_id.into()).or_default().extend(image_objects);
        }
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.images.contains_key(image_id)
    }

    pub fn image_ids(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    /// Objects of an image.
    ///
    /// # Errors
    ///
    /// Returns [`VocEvalError::UnknownImage`] if the image is not indexed.
    pub fn objects(&self, image_id: &str) -> Result<&[GroundTruthObject]> {
        self.images
            .get(image_id)
            .map(Vec::as_slice)
            .ok_or_else(|| VocEvalError::UnknownImage(format!("no ground truth for image '{image_id}'")))
    }

    /// Number of non-difficult objects of `category` in an image.
    pub fn object_count(&self, image_id: &str, category: usize) -> Result<usize> {
        Ok(self
            .objects(image_id)?
            .iter()
            .filter(|object| object.category_id == category && !object.difficult)
            .count())
    }

    /// Check that every object refers to a category of the catalog.
    pub fn validate(&self, catalog: &CategoryCatalog) -> Result<()> {
        for (image_id, objects) in &self.images {
            for object in objects {
                let name = catalog.name(object.category_id).map_err(|_| {
                    VocEvalError::UnknownCategory(format!(
                        "image '{}' has an object with category id {} outside the catalog of {}",
                        image_id,
                        object.category_id,
                        catalog.len()
                    ))
                })?;
                if !object.category_name.is_empty() && object.category_name != name {
                    return Err(VocEvalError::UnknownCategory(format!(
                        "image '{}' labels category {} as '{}', catalog says '{}'",
                        image_id, object.category_id, object.category_name, name
                    )));
                }
            }
        }
        Ok(())
    }
}
