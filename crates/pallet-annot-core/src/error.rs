//! Error types shared by the annotation core.
//!
//! The split follows how each class of failure is handled by a run:
//! geometry errors are recovered per object or frame, configuration errors
//! abort before any output is written, ray-cast errors degrade visibility to
//! "visible", and annotation errors flag a broken invariant.

use thiserror::Error;

use crate::Real;

/// Recoverable problems with the geometry of a single object or frame.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("object `{object_id}` has a degenerate bounding volume (side area {area:.3e})")]
    DegenerateVolume { object_id: String, area: Real },
    #[error("camera basis is degenerate: {0}")]
    DegenerateCamera(&'static str),
    #[error("frame {frame_index} has no trackable objects")]
    NoTrackableObjects { frame_index: usize },
}

/// Invalid configuration values. Always fatal for a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("unknown annotation format `{0}` (expected yolo, coco or voc)")]
    UnknownFormat(String),
    #[error("output root `{path}` is not writable: {reason}")]
    Unwritable { path: String, reason: String },
}

/// Failure of the scene ray-intersection backend.
#[derive(Debug, Error)]
pub enum RaycastError {
    #[error("geometry backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("invalid ray: {0}")]
    InvalidRay(&'static str),
}

/// A detection that violates a core invariant.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("detection for object `{object_id}` has {count} keypoints, expected {expected}")]
    KeypointCount {
        object_id: String,
        count: usize,
        expected: usize,
    },
}
