use pallet_annot_core::ConfigError;
use serde::{Deserialize, Serialize};

use crate::AnnotationFormat;

/// What a [`RunWriter`](crate::RunWriter) writes besides the annotation
/// formats themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Annotation encodings to produce.
    pub formats: Vec<AnnotationFormat>,
    /// Debug coordinates, HTML figure and PNG render per frame.
    pub write_debug: bool,
    /// Face 2D boxes, face 3D coordinates and analysis overlay data per frame.
    pub write_auxiliary: bool,
    /// Free-form description stored in `dataset_info.json` and the COCO
    /// document.
    pub description: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            formats: AnnotationFormat::ALL.to_vec(),
            write_debug: true,
            write_auxiliary: true,
            description: None,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.formats.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "export.formats",
                reason: "at least one format is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn wants(&self, format: AnnotationFormat) -> bool {
        self.formats.contains(&format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_from_json() {
        let cfg: ExportConfig =
            serde_json::from_str(r#"{"formats": ["yolo", "voc"], "write_debug": false}"#).unwrap();
        assert!(cfg.wants(AnnotationFormat::Yolo));
        assert!(!cfg.wants(AnnotationFormat::Coco));
        assert!(cfg.write_auxiliary);
        cfg.validate().unwrap();

        let empty = ExportConfig {
            formats: vec![],
            ..Default::default()
        };
        assert!(empty.validate().is_err());
    }
}
