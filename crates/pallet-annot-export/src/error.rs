//! Error types of the export layer.

use std::path::PathBuf;

use pallet_annot_core::{AnnotationError, ConfigError};
use thiserror::Error;

/// A detection or label line that cannot be encoded or decoded.
///
/// Encoding failures mean a broken core invariant and abort the run.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error("detection for object `{object_id}` in frame {frame_index} is malformed: {reason}")]
    MalformedDetection {
        frame_index: usize,
        object_id: String,
        reason: String,
    },
    #[error("YOLO line has {found} fields, expected {expected}")]
    FieldCount { found: usize, expected: usize },
    #[error("YOLO field {index} is not a number: `{value}`")]
    InvalidField { index: usize, value: String },
    #[error("YOLO visibility flag must be 0 or 2, got `{0}`")]
    InvalidVisibility(String),
    #[error("failed to serialize COCO document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to serialize VOC document: {0}")]
    Xml(String),
}

/// Failure while writing a run to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize `{}`: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode debug image `{}`: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame {0} was already written to this run")]
    DuplicateFrame(usize),
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
