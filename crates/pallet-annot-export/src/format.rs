use std::{fmt, str::FromStr};

use pallet_annot_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Supported annotation encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationFormat {
    /// One keypoint label line per detection, one file per frame.
    Yolo,
    /// One JSON document for the whole run.
    Coco,
    /// One XML document per frame, boxes only.
    Voc,
}

impl AnnotationFormat {
    pub const ALL: [AnnotationFormat; 3] = [Self::Yolo, Self::Coco, Self::Voc];

    pub fn name(self) -> &'static str {
        match self {
            Self::Yolo => "yolo",
            Self::Coco => "coco",
            Self::Voc => "voc",
        }
    }

    /// Parse a comma-separated list such as `yolo,coco`. Duplicates are
    /// dropped, the first occurrence keeps its position.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, ConfigError> {
        let mut out = Vec::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let format = name.parse()?;
            if !out.contains(&format) {
                out.push(format);
            }
        }
        if out.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "formats",
                reason: "at least one format is required".to_string(),
            });
        }
        Ok(out)
    }
}

impl fmt::Display for AnnotationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnnotationFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yolo" => Ok(Self::Yolo),
            "coco" => Ok(Self::Coco),
            "voc" | "pascal_voc" => Ok(Self::Voc),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names_and_lists() {
        assert_eq!("YOLO".parse::<AnnotationFormat>().unwrap(), AnnotationFormat::Yolo);
        assert_eq!(
            AnnotationFormat::parse_list("coco, yolo,coco").unwrap(),
            vec![AnnotationFormat::Coco, AnnotationFormat::Yolo]
        );
        assert!(matches!(
            "kitti".parse::<AnnotationFormat>(),
            Err(ConfigError::UnknownFormat(name)) if name == "kitti"
        ));
        assert!(AnnotationFormat::parse_list(" , ").is_err());
    }
}
