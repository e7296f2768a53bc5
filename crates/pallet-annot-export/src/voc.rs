//! PASCAL VOC documents, one per frame. Keypoints are not part of the VOC
//! schema and are omitted.

use std::path::PathBuf;

use pallet_annot_core::{Category, Detection, Frame, Real, Resolution};
use quick_xml::se::Serializer;
use serde::{Deserialize, Serialize};

use crate::{AnnotationFormat, EncodeError, EncodedRecord, Encoder, encoder::validate_frames};

/// Directory of the VOC documents inside a run.
pub const VOC_DIR: &str = "annotations/voc";

/// Boxes closer than this (normalized) to the image border are marked
/// truncated.
const BORDER_EPS: Real = 1e-6;

/// One VOC `<annotation>` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocAnnotation {
    pub folder: String,
    pub filename: String,
    pub size: VocSize,
    pub segmented: u8,
    #[serde(rename = "object", default)]
    pub objects: Vec<VocObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocSize {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocObject {
    pub name: String,
    /// Face side the box was built from.
    pub pose: String,
    pub truncated: u8,
    pub difficult: u8,
    pub object_id: String,
    pub bndbox: VocBox,
}

/// Pixel box, rounded to whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocBox {
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

impl VocObject {
    fn from_detection(det: &Detection, name: String, res: &Resolution) -> Self {
        let px = det.bbox.to_pixels(res);
        let (min, max) = (det.bbox.min(), det.bbox.max());
        let truncated = min.x <= BORDER_EPS
            || min.y <= BORDER_EPS
            || max.x >= 1.0 - BORDER_EPS
            || max.y >= 1.0 - BORDER_EPS;
        Self {
            name,
            pose: det.face.side.to_string(),
            truncated: u8::from(truncated),
            difficult: 0,
            object_id: det.object_id.clone(),
            bndbox: VocBox {
                xmin: px.x_min.round() as i64,
                ymin: px.y_min.round() as i64,
                xmax: px.x_max.round() as i64,
                ymax: px.y_max.round() as i64,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct VocEncoder {
    categories: Vec<Category>,
}

impl VocEncoder {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    fn class_name(&self, class_id: u32) -> String {
        self.categories
            .iter()
            .find(|c| c.id == class_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("class_{class_id}"))
    }

    /// VOC document of one frame.
    pub fn annotation(&self, frame: &Frame) -> VocAnnotation {
        let res = frame.resolution;
        VocAnnotation {
            folder: "images".to_string(),
            filename: format!("{}.png", frame.file_stem()),
            size: VocSize {
                width: res.width,
                height: res.height,
                depth: 3,
            },
            segmented: 0,
            objects: frame
                .detections
                .iter()
                .map(|det| VocObject::from_detection(det, self.class_name(det.class_id), &res))
                .collect(),
        }
    }

    /// Indented XML of one frame, ending with a newline.
    pub fn frame_xml(&self, frame: &Frame) -> Result<String, EncodeError> {
        let mut xml = String::new();
        let mut ser = Serializer::with_root(&mut xml, Some("annotation"))
            .map_err(|e| EncodeError::Xml(e.to_string()))?;
        ser.indent(' ', 2);
        self.annotation(frame)
            .serialize(ser)
            .map_err(|e| EncodeError::Xml(e.to_string()))?;
        xml.push('\n');
        Ok(xml)
    }
}

impl Encoder for VocEncoder {
    fn format(&self) -> AnnotationFormat {
        AnnotationFormat::Voc
    }

    fn encode(&self, frames: &[Frame]) -> Result<Vec<EncodedRecord>, EncodeError> {
        validate_frames(frames)?;
        frames
            .iter()
            .map(|frame| {
                Ok(EncodedRecord {
                    relative_path: PathBuf::from(VOC_DIR)
                        .join(format!("{}.xml", frame.file_stem())),
                    contents: self.frame_xml(frame)?,
                })
            })
            .collect()
    }
}
