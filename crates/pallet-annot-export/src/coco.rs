//! COCO keypoint document for a whole run.

use std::path::PathBuf;

use pallet_annot_core::{Category, Frame, KEYPOINT_COUNT, KeypointKind, Real};
use serde::{Deserialize, Serialize};

use crate::{AnnotationFormat, EncodeError, EncodedRecord, Encoder, encoder::validate_frames};

/// Path of the COCO document inside a run.
pub const COCO_PATH: &str = "annotations/coco/annotations.json";

/// Face outline as 1-based keypoint index pairs.
pub const SKELETON: [[u32; 2]; 6] = [[3, 1], [1, 4], [4, 6], [6, 2], [2, 5], [5, 3]];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoDocument {
    pub info: CocoInfo,
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoInfo {
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    /// Frame index.
    pub id: usize,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    /// 1-based, in encoding order.
    pub id: usize,
    pub image_id: usize,
    pub category_id: u32,
    /// `[x_min, y_min, width, height]` in pixels.
    pub bbox: [Real; 4],
    pub area: Real,
    pub iscrowd: u8,
    pub segmentation: Vec<Vec<Real>>,
    /// Flattened `[x, y, v]` triples in pixels.
    pub keypoints: Vec<Real>,
    pub num_keypoints: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u32,
    pub name: String,
    pub supercategory: String,
    pub keypoints: Vec<String>,
    pub skeleton: Vec<[u32; 2]>,
}

/// Aggregates all frames of a run into one [`CocoDocument`].
#[derive(Debug, Clone)]
pub struct CocoEncoder {
    categories: Vec<Category>,
    description: String,
}

impl CocoEncoder {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            description: "Pallet face keypoint annotations".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Build the document without serializing it.
    pub fn document(&self, frames: &[Frame]) -> Result<CocoDocument, EncodeError> {
        validate_frames(frames)?;

        let images = frames
            .iter()
            .map(|frame| CocoImage {
                id: frame.index,
                file_name: format!("{}.png", frame.file_stem()),
                width: frame.resolution.width,
                height: frame.resolution.height,
            })
            .collect();

        let mut annotations = Vec::new();
        for frame in frames {
            let res = frame.resolution;
            for det in &frame.detections {
                let px = det.bbox.to_pixels(&res);
                let mut keypoints = Vec::with_capacity(3 * KEYPOINT_COUNT);
                for kp in &det.keypoints {
                    let p = res.to_pixels(&kp.position_2d);
                    keypoints.extend([p.x, p.y, Real::from(kp.visibility.flag())]);
                }
                annotations.push(CocoAnnotation {
                    id: annotations.len() + 1,
                    image_id: frame.index,
                    category_id: det.class_id + 1,
                    bbox: [px.x_min, px.y_min, px.width(), px.height()],
                    area: px.width() * px.height(),
                    iscrowd: 0,
                    segmentation: Vec::new(),
                    keypoints,
                    num_keypoints: det.visible_keypoints(),
                });
            }
        }

        let keypoint_names: Vec<String> = KeypointKind::ORDER
            .iter()
            .map(|k| k.name().to_string())
            .collect();
        let categories = self
            .categories
            .iter()
            .map(|c| CocoCategory {
                id: c.id + 1,
                name: c.name.clone(),
                supercategory: c.supercategory.clone(),
                keypoints: keypoint_names.clone(),
                skeleton: SKELETON.to_vec(),
            })
            .collect();

        Ok(CocoDocument {
            info: CocoInfo {
                description: self.description.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            images,
            annotations,
            categories,
        })
    }
}

impl Encoder for CocoEncoder {
    fn format(&self) -> AnnotationFormat {
        AnnotationFormat::Coco
    }

    fn encode(&self, frames: &[Frame]) -> Result<Vec<EncodedRecord>, EncodeError> {
        let document = self.document(frames)?;
        Ok(vec![EncodedRecord {
            relative_path: PathBuf::from(COCO_PATH),
            contents: serde_json::to_string_pretty(&document)?,
        }])
    }
}
