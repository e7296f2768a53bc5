//! Camera models.
//!
//! A frame's camera is a rigid pose plus pinhole intrinsics:
//! `pixel = K * (x/z, y/z)` with `(x, y, z) = cam_se3_world * p_world`.

mod camera;
mod intrinsics;

pub use camera::{Camera, CameraPose, CameraSpec, ClipRange, Projection, Resolution};
pub use intrinsics::PinholeIntrinsics;
