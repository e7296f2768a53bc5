use serde::{Deserialize, Serialize};

use crate::{Mat3, Pt2, Real, Vec2};

use super::Resolution;

/// Pinhole intrinsics mapping normalized image-plane coordinates to pixels.
///
/// Synthetic renders have square pixels and no skew, so the model keeps only
/// the focal lengths and the principal point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    /// Focal length in pixels along X.
    pub fx: Real,
    /// Focal length in pixels along Y.
    pub fy: Real,
    /// Principal point X coordinate in pixels.
    pub cx: Real,
    /// Principal point Y coordinate in pixels.
    pub cy: Real,
}

impl PinholeIntrinsics {
    /// Intrinsics for a horizontal field of view (radians) with the principal
    /// point at the image center.
    pub fn from_fov_x(fov_x: Real, resolution: Resolution) -> Self {
        let w = resolution.width as Real;
        let h = resolution.height as Real;
        let f = 0.5 * w / (0.5 * fov_x).tan();
        Self {
            fx: f,
            fy: f,
            cx: 0.5 * w,
            cy: 0.5 * h,
        }
    }

    /// Intrinsics from a physical lens and sensor description.
    ///
    /// The sensor width is fitted to the larger image dimension, which is how
    /// the scene-authoring tool resolves its automatic sensor fit.
    pub fn from_focal_mm(focal_mm: Real, sensor_width_mm: Real, resolution: Resolution) -> Self {
        let w = resolution.width as Real;
        let h = resolution.height as Real;
        let f = focal_mm / sensor_width_mm * w.max(h);
        Self {
            fx: f,
            fy: f,
            cx: 0.5 * w,
            cy: 0.5 * h,
        }
    }

    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Horizontal field of view in radians for an image of `width` pixels.
    pub fn fov_x(&self, width: u32) -> Real {
        2.0 * (0.5 * width as Real / self.fx).atan()
    }

    /// Convert normalized image-plane coordinates (`x/z`, `y/z`) to pixels.
    #[inline]
    pub fn normalized_to_pixel(&self, n: &Vec2) -> Pt2 {
        Pt2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    /// Convert pixel coordinates to normalized image-plane coordinates.
    #[inline]
    pub fn pixel_to_normalized(&self, px: &Pt2) -> Vec2 {
        Vec2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy)
    }
}
