//! Per-face geometry dumps written next to the annotations.

use std::path::PathBuf;

use pallet_annot_core::{Frame, KEYPOINT_COUNT, Pt2, Pt3, Real, Vec3};
use serde::{Deserialize, Serialize};

use crate::{EncodedRecord, encoder::fixed6};

pub const FACE_2D_DIR: &str = "face_2d_boxes";
pub const FACE_3D_DIR: &str = "face_3d_coordinates";
pub const ANALYSIS_DIR: &str = "analysis";

/// `object_id side x_min y_min x_max y_max` per detection, in pixels.
pub fn face_boxes_text(frame: &Frame) -> String {
    frame
        .detections
        .iter()
        .map(|det| {
            let px = det.bbox.to_pixels(&frame.resolution);
            format!(
                "{} {} {} {} {} {}",
                det.object_id,
                det.face.side,
                fixed6(px.x_min),
                fixed6(px.y_min),
                fixed6(px.x_max),
                fixed6(px.y_max)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceGeometry {
    pub object_id: String,
    pub side: String,
    pub corners: [Pt3; 4],
    pub normal: Vec3,
    pub center: Pt3,
    pub area: Real,
    /// 3D keypoints in label order.
    pub keypoints: [Pt3; KEYPOINT_COUNT],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameFaces {
    pub frame_index: usize,
    pub camera_position: Pt3,
    pub faces: Vec<FaceGeometry>,
}

pub fn face_geometry(frame: &Frame) -> FrameFaces {
    FrameFaces {
        frame_index: frame.index,
        camera_position: frame.camera.position(),
        faces: frame
            .detections
            .iter()
            .map(|det| FaceGeometry {
                object_id: det.object_id.clone(),
                side: det.face.side.name().to_string(),
                corners: det.face.corners,
                normal: det.face.normal,
                center: det.face.center(),
                area: det.face.area,
                keypoints: det.keypoints.map(|kp| kp.position_3d),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayKeypoint {
    pub name: String,
    pub pixel: Pt2,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayDetection {
    pub object_id: String,
    pub class_id: u32,
    pub side: String,
    /// `[x_min, y_min, x_max, y_max]` in pixels.
    pub bbox: [Real; 4],
    pub keypoints: Vec<OverlayKeypoint>,
}

/// Pixel-space drawing instructions for the analysis image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<OverlayDetection>,
}

pub fn overlay(frame: &Frame) -> Overlay {
    let res = frame.resolution;
    Overlay {
        image: format!("images/{}.png", frame.file_stem()),
        width: res.width,
        height: res.height,
        detections: frame
            .detections
            .iter()
            .map(|det| {
                let px = det.bbox.to_pixels(&res);
                OverlayDetection {
                    object_id: det.object_id.clone(),
                    class_id: det.class_id,
                    side: det.face.side.name().to_string(),
                    bbox: [px.x_min, px.y_min, px.x_max, px.y_max],
                    keypoints: det
                        .keypoints
                        .iter()
                        .map(|kp| OverlayKeypoint {
                            name: kp.kind.name().to_string(),
                            pixel: res.to_pixels(&kp.position_2d),
                            visible: kp.visibility.is_visible(),
                        })
                        .collect(),
                }
            })
            .collect(),
    }
}

/// Face boxes, face geometry and overlay records of one frame.
pub fn auxiliary_records(frame: &Frame) -> Result<Vec<EncodedRecord>, serde_json::Error> {
    let stem = frame.file_stem();
    Ok(vec![
        EncodedRecord {
            relative_path: PathBuf::from(FACE_2D_DIR).join(format!("{stem}.txt")),
            contents: face_boxes_text(frame),
        },
        EncodedRecord {
            relative_path: PathBuf::from(FACE_3D_DIR).join(format!("{stem}.json")),
            contents: serde_json::to_string_pretty(&face_geometry(frame))?,
        },
        EncodedRecord {
            relative_path: PathBuf::from(ANALYSIS_DIR).join(format!("{stem}_overlay.json")),
            contents: serde_json::to_string_pretty(&overlay(frame))?,
        },
    ])
}
