//! Annotation configuration.
//!
//! All values have documented defaults and can be overridden from a JSON
//! config file. [`AnnotationConfig::validate`] must pass before a run starts.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Real};

/// Largest number of faces annotated per object and frame.
pub const MAX_FACES_PER_OBJECT: usize = 2;

/// Which scene objects block lines of sight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occluders {
    /// Every object large enough to occlude.
    #[default]
    All,
    /// Trackable objects only; walls, racks and other props are ignored.
    Trackable,
}

/// Face-level occlusion filtering used during face selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionOptions {
    /// Drop faces hidden behind other geometry.
    pub enabled: bool,
    /// Objects considered by both face and keypoint ray tests.
    pub occluders: Occluders,
    /// Distance tolerance (world units) below which a hit counts as the
    /// target surface itself.
    pub epsilon: Real,
    /// Faces with a larger fraction of hidden sample points are dropped.
    pub max_occluded_ratio: Real,
}

impl Default for OcclusionOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            occluders: Occluders::All,
            epsilon: 1e-3,
            max_occluded_ratio: 0.5,
        }
    }
}

/// One annotation category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Zero-based class id written to YOLO labels. COCO ids are `id + 1`.
    pub id: u32,
    /// Object label this category matches.
    pub name: String,
    #[serde(default = "default_supercategory")]
    pub supercategory: String,
}

fn default_supercategory() -> String {
    "object".to_string()
}

/// Parameters of face selection and keypoint visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Minimum projected 2D box area of a face, in pixels.
    pub min_face_area_px: Real,
    /// Ray-cast keypoints against scene geometry. When disabled, only the
    /// frustum decides keypoint visibility and faces are not occlusion-tested.
    pub check_visibility: bool,
    /// Minimum cosine between the face normal and the direction to the
    /// camera. `0` accepts every front-facing face.
    pub face_confidence_threshold: Real,
    /// At most this many faces per object (1 or 2).
    pub max_faces_per_object: usize,
    /// Camera distances closer than this (world units) rank as ties and are
    /// ordered by alignment instead.
    pub distance_tie_tolerance: Real,
    pub occlusion: OcclusionOptions,
    pub categories: Vec<Category>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            min_face_area_px: 100.0,
            check_visibility: true,
            face_confidence_threshold: 0.0,
            max_faces_per_object: MAX_FACES_PER_OBJECT,
            distance_tie_tolerance: 1e-3,
            occlusion: OcclusionOptions::default(),
            categories: vec![Category {
                id: 0,
                name: "pallet".to_string(),
                supercategory: default_supercategory(),
            }],
        }
    }
}

impl AnnotationConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::InvalidValue {
                field,
                reason: reason.into(),
            }
        }

        if !(self.min_face_area_px >= 0.0 && self.min_face_area_px.is_finite()) {
            return Err(invalid("min_face_area_px", "must be a finite value >= 0"));
        }
        if !(0.0..1.0).contains(&self.face_confidence_threshold) {
            return Err(invalid("face_confidence_threshold", "must lie in [0, 1)"));
        }
        if !(1..=MAX_FACES_PER_OBJECT).contains(&self.max_faces_per_object) {
            return Err(invalid(
                "max_faces_per_object",
                format!("must lie in 1..={MAX_FACES_PER_OBJECT}"),
            ));
        }
        if !(self.distance_tie_tolerance > 0.0 && self.distance_tie_tolerance.is_finite()) {
            return Err(invalid("distance_tie_tolerance", "must be a finite value > 0"));
        }
        if !(self.occlusion.epsilon >= 0.0 && self.occlusion.epsilon.is_finite()) {
            return Err(invalid("occlusion.epsilon", "must be a finite value >= 0"));
        }
        if !(0.0..=1.0).contains(&self.occlusion.max_occluded_ratio) {
            return Err(invalid("occlusion.max_occluded_ratio", "must lie in [0, 1]"));
        }
        if self.categories.is_empty() {
            return Err(invalid("categories", "at least one category is required"));
        }
        for (i, a) in self.categories.iter().enumerate() {
            if self.categories[..i]
                .iter()
                .any(|b| b.id == a.id || b.name == a.name)
            {
                return Err(invalid(
                    "categories",
                    format!("duplicate category `{}` (id {})", a.name, a.id),
                ));
            }
        }
        Ok(())
    }

    /// Category whose name equals the object label.
    pub fn category_for(&self, label: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == label)
    }
}
