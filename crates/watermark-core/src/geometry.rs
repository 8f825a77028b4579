//! Placement math
//!
//! The watermark canvas is rotated once by the watermark angle, so every
//! point computed in the unrotated page layout has to be expressed in the
//! rotated frame before it is drawn. Since `R` is orthonormal its inverse is
//! its transpose.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Standard 2D rotation matrix `[[cos, -sin], [sin, cos]]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix {
    pub cos: f64,
    pub sin: f64,
}

impl RotationMatrix {
    /// Build the matrix for a counter-clockwise angle in degrees
    pub fn from_degrees(angle: f64) -> Self {
        let radians = angle.to_radians();
        Self {
            cos: radians.cos(),
            sin: radians.sin(),
        }
    }

    /// `R · [x, y]^T`
    pub fn apply(&self, x: f64, y: f64) -> Point {
        Point::new(self.cos * x - self.sin * y, self.sin * x + self.cos * y)
    }

    /// `R^T · [x, y]^T`
    pub fn transposed_apply(&self, x: f64, y: f64) -> Point {
        Point::new(self.cos * x + self.sin * y, -self.sin * x + self.cos * y)
    }

    /// Operands of the `cm` operator that rotates user space by this matrix
    pub fn as_cm(&self) -> [f64; 6] {
        [self.cos, self.sin, -self.sin, self.cos, 0.0, 0.0]
    }
}

/// Coordinates to draw at on a canvas rotated by `rotation`, for a point
/// given in the unrotated page layout.
pub fn change_base(x: f64, y: f64, rotation: &RotationMatrix) -> Point {
    rotation.transposed_apply(x, y)
}

/// Shrink an image proportionally until it fits in the box, then apply the
/// scale factor.
///
/// Width is clamped first, then height, so an image that is too wide and
/// too tall ends up limited by whichever constraint binds last.
pub fn fit_image(width: f64, height: f64, max_width: f64, max_height: f64, scale: f64) -> Size {
    let (mut width, mut height) = (width, height);

    if width > max_width {
        let ratio = max_width / width;
        width = max_width;
        height *= ratio;
    }
    if height > max_height {
        let ratio = max_height / height;
        height = max_height;
        width *= ratio;
    }

    Size::new(width * scale, height * scale)
}

/// Bottom-left corner of a box of `size` centred on `center`
pub fn centered_origin(center: Point, size: Size) -> Point {
    Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0)
}
