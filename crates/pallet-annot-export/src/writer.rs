//! Writes annotated frames into an allocated run directory.
//!
//! Every file is created with create-new semantics, so a run never
//! overwrites anything. A frame is fully encoded in memory before its first
//! file is written.

use std::{
    fs::File,
    io::{Cursor, Write},
    path::{Path, PathBuf},
    slice,
};

use image::ImageFormat;
use log::{debug, info};
use pallet_annot_core::{AnnotationConfig, Frame, SceneGeometry};

use crate::{
    AnnotationFormat, CocoEncoder, DATASET_INFO_FILE, DEBUG_COORDINATES_DIR, DEBUG_FIGURES_DIR,
    DEBUG_IMAGES_DIR, DatasetInfo, EncodedRecord, Encoder, ExportConfig, ExportError,
    FACE_3D_DIR, RunLayout, auxiliary_records, coordinates_text, current_timestamp, encoder::validate_frames,
    encoder_for, figure_html, render_top_down,
};

/// Owns an allocated run and the frames written to it so far.
#[derive(Debug)]
pub struct RunWriter {
    layout: RunLayout,
    mode: String,
    export: ExportConfig,
    annotation: AnnotationConfig,
    created_at: u64,
    frames: Vec<Frame>,
}

impl RunWriter {
    /// Validate both configurations and create the run's subdirectories.
    pub fn new(
        layout: RunLayout,
        mode: impl Into<String>,
        export: ExportConfig,
        annotation: AnnotationConfig,
    ) -> Result<Self, ExportError> {
        export.validate()?;
        annotation.validate()?;
        layout.create_subdirs()?;
        Ok(Self {
            layout,
            mode: mode.into(),
            export,
            annotation,
            created_at: current_timestamp(),
            frames: Vec::new(),
        })
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Frames written so far, in write order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Encode and write every per-frame output of `frame`.
    ///
    /// `scene` is the snapshot the frame was annotated against; it feeds the
    /// debug outputs only.
    pub fn write_frame<G>(&mut self, frame: Frame, scene: &G) -> Result<(), ExportError>
    where
        G: SceneGeometry + ?Sized,
    {
        if self.frames.iter().any(|f| f.index == frame.index) {
            return Err(ExportError::DuplicateFrame(frame.index));
        }
        validate_frames(slice::from_ref(&frame))?;

        let mut records = Vec::new();
        for format in [AnnotationFormat::Yolo, AnnotationFormat::Voc] {
            if self.export.wants(format) {
                records.extend(
                    encoder_for(format, &self.annotation).encode(slice::from_ref(&frame))?,
                );
            }
        }
        if self.export.write_auxiliary {
            records.extend(auxiliary_records(&frame).map_err(|source| ExportError::Json {
                path: self.layout.path(FACE_3D_DIR),
                source,
            })?);
        }

        let stem = frame.file_stem();
        let mut render = None;
        if self.export.write_debug {
            records.push(EncodedRecord {
                relative_path: PathBuf::from(DEBUG_COORDINATES_DIR).join(format!("{stem}.txt")),
                contents: coordinates_text(&frame, scene),
            });
            let figure = PathBuf::from(DEBUG_FIGURES_DIR).join(format!("{stem}.html"));
            let html = figure_html(&frame, scene).map_err(|source| ExportError::Json {
                path: self.layout.path(&figure),
                source,
            })?;
            records.push(EncodedRecord {
                relative_path: figure,
                contents: html,
            });

            let png = self
                .layout
                .path(PathBuf::from(DEBUG_IMAGES_DIR).join(format!("{stem}.png")));
            let mut bytes = Vec::new();
            render_top_down(&frame, scene)
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|source| ExportError::Image {
                    path: png.clone(),
                    source,
                })?;
            render = Some((png, bytes));
        }

        for record in &records {
            write_new(&self.layout.path(&record.relative_path), record.contents.as_bytes())?;
        }
        if let Some((path, bytes)) = render {
            write_new(&path, &bytes)?;
        }

        debug!(
            "frame {}: wrote {} detections",
            frame.index,
            frame.detections.len()
        );
        self.frames.push(frame);
        Ok(())
    }

    /// Write the run-level outputs and return the dataset summary.
    pub fn finish(self) -> Result<DatasetInfo, ExportError> {
        if self.export.wants(AnnotationFormat::Coco) {
            let mut coco = CocoEncoder::new(self.annotation.categories.clone());
            if let Some(description) = &self.export.description {
                coco = coco.with_description(description.clone());
            }
            for record in coco.encode(&self.frames)? {
                write_new(&self.layout.path(&record.relative_path), record.contents.as_bytes())?;
            }
        }

        let mut summary = DatasetInfo::summarize(
            &self.mode,
            &self.layout.name(),
            self.created_at,
            &self.frames,
            &self.export.formats,
            &self.annotation.categories,
        );
        summary.description = self.export.description.clone();
        let path = self.layout.path(DATASET_INFO_FILE);
        let json = serde_json::to_string_pretty(&summary).map_err(|source| ExportError::Json {
            path: path.clone(),
            source,
        })?;
        write_new(&path, json.as_bytes())?;

        info!(
            "finished {}: {} frames, {} detections",
            self.layout.root.display(),
            summary.frame_count,
            summary.detection_count
        );
        Ok(summary)
    }
}

/// Create `path` and write `bytes`; fails if the file already exists.
fn write_new(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let mut file = File::create_new(path).map_err(|e| ExportError::io(path, e))?;
    file.write_all(bytes).map_err(|e| ExportError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocate_run;
    use pallet_annot_core::{annotate_frame, synthetic};
    use tempfile::tempdir;

    #[test]
    fn duplicate_frame_is_rejected_and_nothing_is_overwritten() {
        let dir = tempdir().unwrap();
        let layout = allocate_run("single", dir.path()).unwrap();
        let mut writer = RunWriter::new(
            layout,
            "single",
            ExportConfig::default(),
            AnnotationConfig::default(),
        )
        .unwrap();
        let scene = synthetic::single_pallet();
        let camera = synthetic::orbit_cameras(&synthetic::Orbit::default(), 1)
            .unwrap()
            .remove(0);
        let frame = annotate_frame(&scene, &camera, 0, &AnnotationConfig::default());

        writer.write_frame(frame.clone(), &scene).unwrap();
        let label = writer.layout().path("keypoints_labels/frame_000000.txt");
        let before = std::fs::read_to_string(&label).unwrap();
        assert!(matches!(
            writer.write_frame(frame, &scene),
            Err(ExportError::DuplicateFrame(0))
        ));
        assert_eq!(std::fs::read_to_string(&label).unwrap(), before);
        assert!(write_new(&label, b"x").is_err());
    }
}
