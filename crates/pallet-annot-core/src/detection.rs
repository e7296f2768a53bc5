//! Per-frame annotation records.

use serde::{Deserialize, Serialize};

use crate::{
    AnnotationError, Camera, Face, KEYPOINT_COUNT, Keypoint, Pt2, Real, Resolution,
};

/// Axis-aligned image box in normalized `[0, 1]` coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub cx: Real,
    pub cy: Real,
    pub w: Real,
    pub h: Real,
}

impl NormalizedBox {
    /// Tight box around a set of normalized points.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a Pt2>) -> Self {
        let mut min = Pt2::new(Real::INFINITY, Real::INFINITY);
        let mut max = Pt2::new(Real::NEG_INFINITY, Real::NEG_INFINITY);
        for p in points {
            min = Pt2::new(min.x.min(p.x), min.y.min(p.y));
            max = Pt2::new(max.x.max(p.x), max.y.max(p.y));
        }
        if !(min.x <= max.x && min.y <= max.y) {
            return Self::from_corners(Pt2::origin(), Pt2::origin());
        }
        Self::from_corners(min, max)
    }

    pub fn from_corners(min: Pt2, max: Pt2) -> Self {
        Self {
            cx: 0.5 * (min.x + max.x),
            cy: 0.5 * (min.y + max.y),
            w: max.x - min.x,
            h: max.y - min.y,
        }
    }

    #[inline]
    pub fn min(&self) -> Pt2 {
        Pt2::new(self.cx - 0.5 * self.w, self.cy - 0.5 * self.h)
    }

    #[inline]
    pub fn max(&self) -> Pt2 {
        Pt2::new(self.cx + 0.5 * self.w, self.cy + 0.5 * self.h)
    }

    /// `(x_min, y_min, x_max, y_max)` in pixels.
    pub fn to_pixels(&self, resolution: &Resolution) -> PixelBox {
        let min = resolution.to_pixels(&self.min());
        let max = resolution.to_pixels(&self.max());
        PixelBox {
            x_min: min.x,
            y_min: min.y,
            x_max: max.x,
            y_max: max.y,
        }
    }
}

/// Image box in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x_min: Real,
    pub y_min: Real,
    pub x_max: Real,
    pub y_max: Real,
}

impl PixelBox {
    #[inline]
    pub fn width(&self) -> Real {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn height(&self) -> Real {
        self.y_max - self.y_min
    }
}

/// Annotation of one selected face.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub object_id: String,
    /// Zero-based category id.
    pub class_id: u32,
    pub face: Face,
    /// Normalized box enclosing all six keypoints.
    pub bbox: NormalizedBox,
    pub keypoints: [Keypoint; KEYPOINT_COUNT],
}

impl Detection {
    /// Build a detection; the box is derived from the keypoints.
    pub fn new(class_id: u32, face: Face, keypoints: [Keypoint; KEYPOINT_COUNT]) -> Self {
        let bbox = NormalizedBox::enclosing(keypoints.iter().map(|k| &k.position_2d));
        Self {
            object_id: face.object_id.clone(),
            class_id,
            face,
            bbox,
            keypoints,
        }
    }

    /// Build a detection from a keypoint list of unchecked length.
    ///
    /// # Errors
    ///
    /// [`AnnotationError::KeypointCount`] unless exactly six keypoints are
    /// given.
    pub fn try_from_keypoints(
        class_id: u32,
        face: Face,
        keypoints: Vec<Keypoint>,
    ) -> Result<Self, AnnotationError> {
        let count = keypoints.len();
        let keypoints: [Keypoint; KEYPOINT_COUNT] =
            keypoints
                .try_into()
                .map_err(|_| AnnotationError::KeypointCount {
                    object_id: face.object_id.clone(),
                    count,
                    expected: KEYPOINT_COUNT,
                })?;
        Ok(Self::new(class_id, face, keypoints))
    }

    /// Number of keypoints flagged visible.
    pub fn visible_keypoints(&self) -> usize {
        self.keypoints
            .iter()
            .filter(|k| k.visibility.is_visible())
            .count()
    }
}

/// All detections of one rendered image.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Frame {
    pub index: usize,
    pub resolution: Resolution,
    pub camera: Camera,
    pub detections: Vec<Detection>,
}

impl Frame {
    pub fn new(index: usize, camera: Camera) -> Self {
        Self {
            index,
            resolution: camera.resolution,
            camera,
            detections: Vec::new(),
        }
    }

    /// `frame_NNNNNN` stem shared by every per-frame file.
    pub fn file_stem(&self) -> String {
        format!("frame_{:06}", self.index)
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeypointKind, Pt3, Vec3, Visibility};

    fn face() -> Face {
        Face {
            object_id: "p".into(),
            side: crate::FaceSide::Front,
            corners: [Pt3::origin(); 4],
            normal: -Vec3::y(),
            area: 1.0,
        }
    }

    fn keypoints() -> Vec<Keypoint> {
        let pts = [
            (0.5, 0.2),
            (0.5, 0.8),
            (0.3, 0.2),
            (0.7, 0.25),
            (0.3, 0.8),
            (0.7, 0.75),
        ];
        KeypointKind::ORDER
            .iter()
            .zip(pts)
            .map(|(kind, (x, y))| Keypoint {
                kind: *kind,
                position_3d: Pt3::origin(),
                position_2d: Pt2::new(x, y),
                visibility: Visibility::Visible,
            })
            .collect()
    }

    #[test]
    fn box_encloses_all_keypoints() {
        let det = Detection::try_from_keypoints(0, face(), keypoints()).unwrap();
        assert!((det.bbox.cx - 0.5).abs() < 1e-12);
        assert!((det.bbox.cy - 0.5).abs() < 1e-12);
        assert!((det.bbox.w - 0.4).abs() < 1e-12);
        assert!((det.bbox.h - 0.6).abs() < 1e-12);
        let (min, max) = (det.bbox.min(), det.bbox.max());
        for k in &det.keypoints {
            assert!(k.position_2d.x >= min.x - 1e-12 && k.position_2d.x <= max.x + 1e-12);
            assert!(k.position_2d.y >= min.y - 1e-12 && k.position_2d.y <= max.y + 1e-12);
        }
    }

    #[test]
    fn wrong_keypoint_count_is_rejected() {
        let mut kps = keypoints();
        kps.pop();
        let err = Detection::try_from_keypoints(0, face(), kps).unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::KeypointCount {
                count: 5,
                expected: 6,
                ..
            }
        ));
    }

    #[test]
    fn pixel_box() {
        let b = NormalizedBox::from_corners(Pt2::new(0.25, 0.5), Pt2::new(0.75, 1.0));
        let px = b.to_pixels(&Resolution::new(200, 100).unwrap());
        assert!((px.x_min - 50.0).abs() < 1e-9 && (px.x_max - 150.0).abs() < 1e-9);
        assert!((px.y_min - 50.0).abs() < 1e-9 && (px.y_max - 100.0).abs() < 1e-9);
        assert!((px.width() - 100.0).abs() < 1e-9);
    }
}
