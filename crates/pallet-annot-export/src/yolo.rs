//! YOLO keypoint labels.
//!
//! One line per detection:
//! `class cx cy w h x0 y0 v0 ... x5 y5 v5`, geometric values normalized with
//! six decimals, visibility `2` or `0`. Lines are joined with `\n`, without a
//! trailing newline; a frame without detections gives an empty file.

use std::path::PathBuf;

use pallet_annot_core::{
    Detection, Frame, KEYPOINT_COUNT, NormalizedBox, Pt2, Real, Resolution, Visibility,
};

use crate::{
    AnnotationFormat, EncodeError, EncodedRecord, Encoder,
    encoder::{fixed6, validate_frames},
};

/// Fields per label line.
pub const YOLO_FIELDS: usize = 5 + 3 * KEYPOINT_COUNT;

/// Directory of the label files inside a run.
pub const YOLO_DIR: &str = "keypoints_labels";

#[derive(Debug, Clone, Copy, Default)]
pub struct YoloEncoder;

impl YoloEncoder {
    /// Label line of one detection.
    pub fn line(det: &Detection) -> String {
        let mut fields = Vec::with_capacity(YOLO_FIELDS);
        fields.push(det.class_id.to_string());
        for v in [det.bbox.cx, det.bbox.cy, det.bbox.w, det.bbox.h] {
            fields.push(fixed6(v));
        }
        for kp in &det.keypoints {
            fields.push(fixed6(kp.position_2d.x));
            fields.push(fixed6(kp.position_2d.y));
            fields.push(kp.visibility.flag().to_string());
        }
        fields.join(" ")
    }

    /// Label file contents of one frame.
    pub fn frame_text(frame: &Frame) -> String {
        frame
            .detections
            .iter()
            .map(Self::line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Encoder for YoloEncoder {
    fn format(&self) -> AnnotationFormat {
        AnnotationFormat::Yolo
    }

    fn encode(&self, frames: &[Frame]) -> Result<Vec<EncodedRecord>, EncodeError> {
        validate_frames(frames)?;
        Ok(frames
            .iter()
            .map(|frame| EncodedRecord {
                relative_path: PathBuf::from(YOLO_DIR).join(format!("{}.txt", frame.file_stem())),
                contents: Self::frame_text(frame),
            })
            .collect())
    }
}

/// A decoded YOLO label line.
#[derive(Debug, Clone, PartialEq)]
pub struct YoloRecord {
    pub class_id: u32,
    pub bbox: NormalizedBox,
    pub keypoints: [(Pt2, Visibility); KEYPOINT_COUNT],
}

impl YoloRecord {
    /// Box as `(x_min, y_min, width, height)` in pixels.
    pub fn bbox_pixels(&self, resolution: &Resolution) -> [Real; 4] {
        let px = self.bbox.to_pixels(resolution);
        [px.x_min, px.y_min, px.width(), px.height()]
    }
}

/// Parse one label line produced by [`YoloEncoder`].
pub fn parse_yolo_line(line: &str) -> Result<YoloRecord, EncodeError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != YOLO_FIELDS {
        return Err(EncodeError::FieldCount {
            found: fields.len(),
            expected: YOLO_FIELDS,
        });
    }
    let number = |index: usize| -> Result<Real, EncodeError> {
        fields[index]
            .parse::<Real>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| EncodeError::InvalidField {
                index,
                value: fields[index].to_string(),
            })
    };

    let class_id = fields[0]
        .parse::<u32>()
        .map_err(|_| EncodeError::InvalidField {
            index: 0,
            value: fields[0].to_string(),
        })?;
    let bbox = NormalizedBox {
        cx: number(1)?,
        cy: number(2)?,
        w: number(3)?,
        h: number(4)?,
    };

    let mut keypoints = [(Pt2::origin(), Visibility::Hidden); KEYPOINT_COUNT];
    for (i, slot) in keypoints.iter_mut().enumerate() {
        let base = 5 + 3 * i;
        let flag = fields[base + 2];
        let visibility = flag
            .parse::<u8>()
            .ok()
            .and_then(Visibility::from_flag)
            .ok_or_else(|| EncodeError::InvalidVisibility(flag.to_string()))?;
        *slot = (Pt2::new(number(base)?, number(base + 1)?), visibility);
    }

    Ok(YoloRecord {
        class_id,
        bbox,
        keypoints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pallet_annot_core::{AnnotationConfig, annotate_frame, synthetic};

    fn frame() -> Frame {
        let scene = synthetic::warehouse(5, 2, 2);
        let camera = synthetic::orbit_cameras(
            &synthetic::Orbit {
                radius: 7.0,
                ..Default::default()
            },
            8,
        )
        .unwrap()
        .remove(1);
        annotate_frame(&scene, &camera, 12, &AnnotationConfig::default())
    }

    #[test]
    fn line_layout() {
        let frame = frame();
        assert!(!frame.detections.is_empty());
        let text = YoloEncoder::frame_text(&frame);
        assert!(!text.ends_with('\n'));
        assert_eq!(text.lines().count(), frame.detections.len());
        for (line, det) in text.lines().zip(&frame.detections) {
            let fields: Vec<_> = line.split(' ').collect();
            assert_eq!(fields.len(), YOLO_FIELDS);
            assert_eq!(fields[0], det.class_id.to_string());
            assert!(fields[1..].iter().all(|v| v.parse::<f64>().is_ok()));
            for i in 0..KEYPOINT_COUNT {
                let flag = fields[5 + 3 * i + 2];
                assert!(flag == "0" || flag == "2", "flag {flag}");
                let x = fields[5 + 3 * i];
                assert_eq!(x.split('.').nth(1).map(str::len), Some(6));
            }
        }
    }

    #[test]
    fn encoding_is_idempotent() {
        let frames = vec![frame()];
        let a = YoloEncoder.encode(&frames).unwrap();
        let b = YoloEncoder.encode(&frames).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a[0].relative_path,
            PathBuf::from("keypoints_labels/frame_000012.txt")
        );
    }

    #[test]
    fn decoded_box_matches_detection() {
        let frame = frame();
        let text = YoloEncoder::frame_text(&frame);
        for (line, det) in text.lines().zip(&frame.detections) {
            let rec = parse_yolo_line(line).unwrap();
            assert_eq!(rec.class_id, det.class_id);
            assert!((rec.bbox.cx - det.bbox.cx).abs() < 1e-4);
            assert!((rec.bbox.cy - det.bbox.cy).abs() < 1e-4);
            assert!((rec.bbox.w - det.bbox.w).abs() < 1e-4);
            assert!((rec.bbox.h - det.bbox.h).abs() < 1e-4);

            // Pixel round trip through the frame resolution.
            let [x, y, w, h] = rec.bbox_pixels(&frame.resolution);
            let res = frame.resolution;
            let cx = (x + 0.5 * w) / res.width as f64;
            let cy = (y + 0.5 * h) / res.height as f64;
            assert!((cx - det.bbox.cx).abs() < 1e-4);
            assert!((cy - det.bbox.cy).abs() < 1e-4);
            for (kp, (p, v)) in det.keypoints.iter().zip(&rec.keypoints) {
                assert_eq!(kp.visibility, *v);
                assert!((kp.position_2d - *p).norm() < 1e-5);
            }
        }
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(
            parse_yolo_line("0 0.5 0.5"),
            Err(EncodeError::FieldCount { found: 3, .. })
        ));
        let mut fields = vec!["0"; YOLO_FIELDS];
        fields[7] = "1";
        assert!(matches!(
            parse_yolo_line(&fields.join(" ")),
            Err(EncodeError::InvalidVisibility(_))
        ));
        fields[7] = "2";
        fields[3] = "abc";
        assert!(matches!(
            parse_yolo_line(&fields.join(" ")),
            Err(EncodeError::InvalidField { index: 3, .. })
        ));
        fields[3] = "0.1";
        assert!(parse_yolo_line(&fields.join(" ")).is_ok());
    }
}
