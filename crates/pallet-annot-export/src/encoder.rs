//! Format-independent encoding interface.
//!
//! All three encoders consume the same `&[Frame]` input and return
//! [`EncodedRecord`]s with paths relative to the run directory. Encoders never
//! reorder detections or keypoints, so identical input gives byte-identical
//! output.

use std::path::PathBuf;

use pallet_annot_core::{AnnotationConfig, Detection, Frame, KEYPOINT_COUNT, Real};

use crate::{AnnotationFormat, CocoEncoder, EncodeError, VocEncoder, YoloEncoder};

/// Slack allowed when checking normalized values and box containment.
const NORM_TOLERANCE: Real = 1e-9;

/// One encoded output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    /// Path relative to the run directory.
    pub relative_path: PathBuf,
    pub contents: String,
}

/// An annotation encoding.
pub trait Encoder {
    fn format(&self) -> AnnotationFormat;

    /// Encode `frames` into one or more records.
    fn encode(&self, frames: &[Frame]) -> Result<Vec<EncodedRecord>, EncodeError>;
}

/// Encoder for `format`, using `config` for category metadata.
pub fn encoder_for(format: AnnotationFormat, config: &AnnotationConfig) -> Box<dyn Encoder> {
    match format {
        AnnotationFormat::Yolo => Box::new(YoloEncoder),
        AnnotationFormat::Coco => Box::new(CocoEncoder::new(config.categories.clone())),
        AnnotationFormat::Voc => Box::new(VocEncoder::new(config.categories.clone())),
    }
}

/// Encode `frames` with the default categories of `config`.
pub fn encode(
    frames: &[Frame],
    format: AnnotationFormat,
    config: &AnnotationConfig,
) -> Result<Vec<EncodedRecord>, EncodeError> {
    encoder_for(format, config).encode(frames)
}

/// Check the invariants every encoder relies on: finite normalized values,
/// a box enclosing all keypoints and exactly [`KEYPOINT_COUNT`] keypoints in
/// label order.
pub fn validate_detection(frame_index: usize, det: &Detection) -> Result<(), EncodeError> {
    let malformed = |reason: String| EncodeError::MalformedDetection {
        frame_index,
        object_id: det.object_id.clone(),
        reason,
    };
    let unit = -NORM_TOLERANCE..=1.0 + NORM_TOLERANCE;

    let b = &det.bbox;
    for (name, v) in [("cx", b.cx), ("cy", b.cy), ("w", b.w), ("h", b.h)] {
        if !unit.contains(&v) {
            return Err(malformed(format!("box {name} = {v} outside [0, 1]")));
        }
    }
    let (min, max) = (b.min(), b.max());
    for (i, kp) in det.keypoints.iter().enumerate() {
        if kp.kind.index() != i {
            return Err(malformed(format!("keypoint {i} is {}", kp.kind.name())));
        }
        let p = kp.position_2d;
        if !(unit.contains(&p.x) && unit.contains(&p.y)) {
            return Err(malformed(format!("keypoint {i} at ({}, {}) outside [0, 1]", p.x, p.y)));
        }
        let inside = p.x >= min.x - NORM_TOLERANCE
            && p.x <= max.x + NORM_TOLERANCE
            && p.y >= min.y - NORM_TOLERANCE
            && p.y <= max.y + NORM_TOLERANCE;
        if !inside {
            return Err(malformed(format!("keypoint {i} lies outside the box")));
        }
    }
    debug_assert_eq!(det.keypoints.len(), KEYPOINT_COUNT);
    Ok(())
}

/// Validate every detection of every frame.
pub(crate) fn validate_frames(frames: &[Frame]) -> Result<(), EncodeError> {
    for frame in frames {
        for det in &frame.detections {
            validate_detection(frame.index, det)?;
        }
    }
    Ok(())
}

/// Fixed-precision formatting shared by the text encoders.
pub(crate) fn fixed6(v: Real) -> String {
    // Avoid "-0.000000" for tiny negative values.
    let v = if v.abs() < 5e-7 { 0.0 } else { v };
    format!("{v:.6}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_precision() {
        assert_eq!(fixed6(0.5), "0.500000");
        assert_eq!(fixed6(-1e-9), "0.000000");
        assert_eq!(fixed6(1.0 / 3.0), "0.333333");
    }
}
