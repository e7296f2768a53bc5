//! `dataset_info.json`, the run-level summary.

use std::time::SystemTime;

use pallet_annot_core::{Category, Frame, KeypointKind, Pt3, Resolution};
use serde::{Deserialize, Serialize};

use crate::AnnotationFormat;

pub const DATASET_INFO_FILE: &str = "dataset_info.json";

/// Per-frame entry of [`DatasetInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    pub index: usize,
    pub camera_position: Pt3,
    pub faces_detected: usize,
    pub keypoints_total: usize,
    pub keypoints_visible: usize,
}

impl FrameMeta {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            index: frame.index,
            camera_position: frame.camera.position(),
            faces_detected: frame.detections.len(),
            keypoints_total: frame.detections.iter().map(|d| d.keypoints.len()).sum(),
            keypoints_visible: frame.detections.iter().map(|d| d.visible_keypoints()).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub mode: String,
    pub run_name: String,
    /// Unix timestamp (seconds) of the run's creation.
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub formats: Vec<AnnotationFormat>,
    /// Distinct frame resolutions, in first-seen order.
    pub resolutions: Vec<Resolution>,
    pub frame_count: usize,
    pub detection_count: usize,
    pub keypoints_total: usize,
    pub keypoints_visible: usize,
    pub keypoint_names: Vec<String>,
    pub categories: Vec<Category>,
    pub frames: Vec<FrameMeta>,
}

impl DatasetInfo {
    /// Summarize `frames`; counts are derived, never stored separately.
    pub fn summarize(
        mode: &str,
        run_name: &str,
        created_at: u64,
        frames: &[Frame],
        formats: &[AnnotationFormat],
        categories: &[Category],
    ) -> Self {
        let metas: Vec<FrameMeta> = frames.iter().map(FrameMeta::from_frame).collect();
        let mut resolutions = Vec::new();
        for frame in frames {
            if !resolutions.contains(&frame.resolution) {
                resolutions.push(frame.resolution);
            }
        }
        Self {
            mode: mode.to_string(),
            run_name: run_name.to_string(),
            created_at,
            description: None,
            formats: formats.to_vec(),
            resolutions,
            frame_count: frames.len(),
            detection_count: metas.iter().map(|m| m.faces_detected).sum(),
            keypoints_total: metas.iter().map(|m| m.keypoints_total).sum(),
            keypoints_visible: metas.iter().map(|m| m.keypoints_visible).sum(),
            keypoint_names: KeypointKind::ORDER
                .iter()
                .map(|k| k.name().to_string())
                .collect(),
            categories: categories.to_vec(),
            frames: metas,
        }
    }
}

/// Current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
