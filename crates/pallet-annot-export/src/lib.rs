//! Annotation encoders and run output for `pallet-annot`.
//!
//! This crate turns [`Frame`](pallet_annot_core::Frame) records into files:
//!
//! - YOLO keypoint labels, a run-wide COCO document and per-frame VOC XML,
//!   all behind the [`Encoder`] trait,
//! - numbered run directories (`generated_NNNNNN`) via [`allocate_run`],
//! - a [`RunWriter`] that writes per-frame outputs with create-new semantics
//!   and finishes the run with the COCO document and `dataset_info.json`.
//!
//! ```no_run
//! use pallet_annot_core::{AnnotationConfig, annotate_frame, synthetic};
//! use pallet_annot_export::{ExportConfig, RunWriter, allocate_run};
//! # fn main() -> anyhow::Result<()> {
//! let scene = synthetic::warehouse(7, 2, 3);
//! let cameras = synthetic::orbit_cameras(&synthetic::Orbit::default(), 12)?;
//! let config = AnnotationConfig::default();
//!
//! let layout = allocate_run("warehouse", "output".as_ref())?;
//! let mut writer = RunWriter::new(layout, "warehouse", ExportConfig::default(), config.clone())?;
//! for (i, camera) in cameras.iter().enumerate() {
//!     writer.write_frame(annotate_frame(&scene, camera, i, &config), &scene)?;
//! }
//! let info = writer.finish()?;
//! println!("{} detections", info.detection_count);
//! # Ok(())
//! # }
//! ```

// Encoders
mod coco;
mod encoder;
mod format;
mod voc;
mod yolo;

// Run output
mod auxiliary;
mod config;
mod dataset_info;
mod debug;
mod error;
mod run;
mod writer;

pub use auxiliary::*;
pub use coco::*;
pub use config::*;
pub use dataset_info::*;
pub use debug::*;
pub use encoder::{EncodedRecord, Encoder, encode, encoder_for, validate_detection};
pub use error::*;
pub use format::*;
pub use run::*;
pub use voc::*;
pub use writer::*;
pub use yolo::*;
