//! Box geometry in the two representations used by the grid codec.
//!
//! - [`BoundingBox`] is center-form `(x, y, w, h)` in floating point, the form the
//!   network predicts.
//! - [`VocBox`] is integer corner-form `(xmin, ymin, xmax, ymax)` using the inclusive
//!   pixel convention (`width = xmax - xmin + 1`), the form ground truth is annotated in
//!   and the form every overlap computation runs on.
//!
//! Both carry an all-`-1` sentinel meaning "no box".

use serde::{Deserialize, Serialize};

use crate::error::{Result, VocEvalError};

/// Center-form box `(x, y, w, h)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl BoundingBox {
    /// The "no box" sentinel.
    pub const NONE: BoundingBox = BoundingBox {
        x: -1.0,
        y: -1.0,
        w: -1.0,
        h: -1.0,
    };

    /// Create a new center-form box.
    ///
    /// # Errors
    ///
    /// Returns [`VocEvalError::InvalidGeometry`] if any component is negative or not finite.
    ///
    /// # Example
    ///
    /// ```
    /// use voc_eval::geometry::BoundingBox;
    ///
    /// let b = BoundingBox::new(30.0, 30.0, 40.0, 20.0).unwrap();
    /// assert_eq!(b.w(), 40.0);
    /// assert!(BoundingBox::new(-1.0, 0.0, 1.0, 1.0).is_err());
    /// ```
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Result<Self> {
        if [x, y, w, h].iter().any(|v| !v.is_finite()) {
            return Err(VocEvalError::InvalidGeometry(format!(
                "box components must be finite, got ({x}, {y}, {w}, {h})"
            )));
        }
        if x < 0.0 || y < 0.0 || w < 0.0 || h < 0.0 {
            return Err(VocEvalError::InvalidGeometry(format!(
                "box cannot have negative values, got ({x}, {y}, {w}, {h})"
            )));
        }
        Ok(Self { x, y, w, h })
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn w(&self) -> f32 {
        self.w
    }

    pub fn h(&self) -> f32 {
        self.h
    }

    /// Whether this is the [`BoundingBox::NONE`] sentinel.
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Scale center and extents independently along each axis.
    #[must_use]
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            w: self.w * sx,
            h: self.h * sy,
        }
    }
}

impl From<VocBox> for BoundingBox {
    fn from(b: VocBox) -> Self {
        if b.is_sentinel() {
            return Self::NONE;
        }
        let w = (b.xmax - b.xmin) as f32;
        let h = (b.ymax - b.ymin) as f32;
        Self {
            x: b.xmin as f32 + w / 2.0,
            y: b.ymin as f32 + h / 2.0,
            w,
            h,
        }
    }
}

/// Integer corner-form box with inclusive pixel extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VocBox {
    xmin: i32,
    ymin: i32,
    xmax: i32,
    ymax: i32,
}

impl Default for VocBox {
    fn default() -> Self {
        Self::INVALID
    }
}

impl VocBox {
    /// The "invalid / absent" sentinel, all coordinates `-1`.
    pub const INVALID: VocBox = VocBox {
        xmin: -1,
        ymin: -1,
        xmax: -1,
        ymax: -1,
    };

    /// Create a new corner-form box.
    ///
    /// # Errors
    ///
    /// Returns [`VocEvalError::InvalidGeometry`] for negative coordinates or when
    /// `xmin > xmax` / `ymin > ymax`.
    ///
    /// # Example
    ///
    /// ```
    /// use voc_eval::geometry::VocBox;
    ///
    /// let b = VocBox::new(10, 10, 50, 50).unwrap();
    /// assert_eq!(b.w(), 41);
    /// assert_eq!(b.area(), 41 * 41);
    /// assert!(VocBox::new(50, 10, 10, 50).is_err());
    /// ```
    pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Result<Self> {
        if xmin < 0 || ymin < 0 || xmax < 0 || ymax < 0 {
            return Err(VocEvalError::InvalidGeometry(format!(
                "box cannot have negative values, got ({xmin}, {ymin}, {xmax}, {ymax})"
            )));
        }
        if xmin > xmax || ymin > ymax {
            return Err(VocEvalError::InvalidGeometry(format!(
                "box cannot have negative width or height, got ({xmin}, {ymin}, {xmax}, {ymax})"
            )));
        }
        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    pub fn xmin(&self) -> i32 {
        self.xmin
    }

    pub fn ymin(&self) -> i32 {
        self.ymin
    }

    pub fn xmax(&self) -> i32 {
        self.xmax
    }

    pub fn ymax(&self) -> i32 {
        self.ymax
    }

    /// Inclusive width, `xmax - xmin + 1`.
    pub fn w(&self) -> i32 {
        self.xmax - self.xmin + 1
    }

    /// Inclusive height, `ymax - ymin + 1`.
    pub fn h(&self) -> i32 {
        self.ymax - self.ymin + 1
    }

    pub fn area(&self) -> i32 {
        self.w() * self.h()
    }

    /// Whether every coordinate is the `-1` sentinel.
    pub fn is_sentinel(&self) -> bool {
        *self == Self::INVALID
    }

    /// Intersection area under the inclusive pixel convention.
    ///
    /// The extents are not clamped at zero: two boxes that are disjoint along both axes
    /// produce two negative extents whose product is positive. Overlap and matching code
    /// downstream see that value unchanged.
    pub fn intersection_area(&self, other: &VocBox) -> f32 {
        let iw = (self.xmax.min(other.xmax) - self.xmin.max(other.xmin) + 1) as f32;
        let ih = (self.ymax.min(other.ymax) - self.ymin.max(other.ymin) + 1) as f32;
        iw * ih
    }

    /// Intersection over union.
    ///
    /// # Example
    ///
    /// ```
    /// use voc_eval::geometry::VocBox;
    ///
    /// let a = VocBox::new(0, 0, 9, 9).unwrap();
    /// assert_eq!(a.overlap(&a), 1.0);
    /// ```
    pub fn overlap(&self, other: &VocBox) -> f32 {
        let intersection = self.intersection_area(other);
        let union = (self.area() + other.area()) as f32 - intersection;
        intersection / union
    }

    /// Clamp the box to `[0, image_width] x [0, image_height]`.
    ///
    /// A box lying entirely outside the image becomes [`VocBox::INVALID`].
    #[must_use]
    pub fn clip_to_image_boundaries(&self, image_width: i32, image_height: i32) -> Self {
        let clipped = Self {
            xmin: self.xmin.max(0),
            ymin: self.ymin.max(0),
            xmax: self.xmax.min(image_width),
            ymax: self.ymax.min(image_height),
        };

        if clipped.xmin > image_width - 1
            || clipped.ymin > image_height - 1
            || clipped.xmax < 1
            || clipped.ymax < 1
        {
            return Self::INVALID;
        }

        clipped
    }

    /// False if any coordinate is negative or the box collapses to a line.
    pub fn is_valid(&self) -> bool {
        if self.xmin < 0 || self.ymin < 0 || self.xmax < 0 || self.ymax < 0 {
            return false;
        }
        self.xmin != self.xmax && self.ymin != self.ymax
    }

    #[must_use]
    pub fn translate(&self, tx: i32, ty: i32) -> Self {
        Self {
            xmin: self.xmin + tx,
            ymin: self.ymin + ty,
            xmax: self.xmax + tx,
            ymax: self.ymax + ty,
        }
    }

    /// Scale each coordinate, truncating toward zero.
    #[must_use]
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self {
            xmin: (sx * self.xmin as f32) as i32,
            ymin: (sy * self.ymin as f32) as i32,
            xmax: (sx * self.xmax as f32) as i32,
            ymax: (sy * self.ymax as f32) as i32,
        }
    }

    /// Mirror the box about the vertical axis of an image of the given width.
    ///
    /// The name follows the flip flag of the data transformation; the box moves
    /// horizontally: `xmin' = width - xmax`, `xmax' = width - xmin`.
    #[must_use]
    pub fn flip_vertical(&self, image_width: i32) -> Self {
        Self {
            xmin: image_width - self.xmax,
            ymin: self.ymin,
            xmax: image_width - self.xmin,
            ymax: self.ymax,
        }
    }
}

impl From<BoundingBox> for VocBox {
    /// Corners from center and half extents, truncated toward zero.
    /// The top-left corner is clamped to the image origin.
    fn from(b: BoundingBox) -> Self {
        if b.is_none() {
            return Self::INVALID;
        }
        let half_width = b.w / 2.0;
        let half_height = b.h / 2.0;
        Self {
            xmin: ((b.x - half_width) as i32).max(0),
            ymin: ((b.y - half_height) as i32).max(0),
            xmax: (b.x + half_width) as i32,
            ymax: (b.y + half_height) as i32,
        }
    }
}
