//! Core geometry and annotation primitives for `pallet-annot`.
//!
//! This crate turns one scene snapshot and one camera into keypoint
//! annotations:
//!
//! - linear algebra type aliases (`Real`, `Vec3`, `Pt3`, and friends),
//! - a pinhole camera with look-at and scene-tool constructors,
//! - scene snapshots with oriented bounding volumes and ray queries,
//! - face extraction, visibility tests, face selection and keypoints,
//! - a per-frame pipeline producing [`Frame`] records.
//!
//! Pipeline (per frame):
//! `extract_faces -> select_faces -> make_keypoints -> Detection`
//!
//! Every operation takes the camera and a [`SceneGeometry`] capability as
//! explicit parameters, so frames can be annotated independently of any live
//! scene graph.
//!
//! # Modules
//!
//! - \[`math`\]: type aliases and small point helpers.
//! - \[`models`\]: camera model and intrinsics.
//! - \[`scene`\]: bounding volumes, scene objects, ray queries.
//! - \[`synthetic`\]: deterministic synthetic scenes (tests, CLI demo mode).
//!
//! # Example
//!
//! ```no_run
//! use pallet_annot_core::{AnnotationConfig, annotate_frame, synthetic};
//!
//! let scene = synthetic::single_pallet();
//! let cameras = synthetic::orbit_cameras(&synthetic::Orbit::default(), 8).unwrap();
//! for (i, camera) in cameras.iter().enumerate() {
//!     let frame = annotate_frame(&scene, camera, i, &AnnotationConfig::default());
//!     println!("frame {i}: {} detections", frame.detections.len());
//! }
//! ```

/// Annotation configuration.
mod config;
/// Detection and frame records.
mod detection;
mod error;
/// Side-face extraction.
mod face;
/// Keypoint generation.
mod keypoints;
/// Linear algebra type aliases and helpers.
mod math;
/// Camera models.
mod models;
mod pipeline;
/// Scene snapshots and ray queries.
mod scene;
/// Face ranking and selection.
mod selection;
/// Deterministic synthetic scenes and camera paths.
pub mod synthetic;
/// Line-of-sight and orientation tests.
mod visibility;

pub use config::*;
pub use detection::*;
pub use error::*;
pub use face::*;
pub use keypoints::*;
pub use math::*;
pub use models::*;
pub use pipeline::*;
pub use scene::*;
pub use selection::*;
pub use visibility::*;
