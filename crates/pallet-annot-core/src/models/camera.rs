use anyhow::Result;
use nalgebra::{Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, GeometryError, Iso3, Mat3, Pt2, Pt3, Real, Vec2, Vec3};

use super::PinholeIntrinsics;

/// Depth below which a point counts as behind the camera.
const BEHIND_EPS: Real = 1e-9;

/// Image resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Build a resolution, rejecting empty images.
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        let res = Self { width, height };
        res.validate()?;
        Ok(res)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidResolution {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Convert a normalized `[0, 1]` image position to pixels.
    #[inline]
    pub fn to_pixels(&self, n: &Pt2) -> Pt2 {
        Pt2::new(n.x * self.width as Real, n.y * self.height as Real)
    }

    /// Convert a pixel position to normalized `[0, 1]` coordinates.
    #[inline]
    pub fn to_normalized(&self, px: &Pt2) -> Pt2 {
        Pt2::new(px.x / self.width as Real, px.y / self.height as Real)
    }

    #[inline]
    pub fn area(&self) -> Real {
        self.width as Real * self.height as Real
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Near/far clip distances along the viewing axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    pub near: Real,
    pub far: Real,
}

impl Default for ClipRange {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Result of projecting one world point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Normalized image position, clamped to `[0, 1]`.
    pub normalized: Pt2,
    /// Depth along the camera +Z axis.
    pub depth: Real,
    /// `false` when the point is behind the camera.
    pub in_front: bool,
    /// `true` when the unclamped position falls inside the image.
    pub in_image: bool,
}

/// A pinhole camera valid for one frame.
///
/// Camera frame convention: +X right, +Y down, +Z forward. A world point maps
/// to the camera frame through `p_c = cam_se3_world * p_w`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Camera {
    /// Transform from world coordinates to camera coordinates.
    pub cam_se3_world: Iso3,
    pub intrinsics: PinholeIntrinsics,
    pub resolution: Resolution,
    pub clip: ClipRange,
}

impl Camera {
    pub fn new(
        cam_se3_world: Iso3,
        intrinsics: PinholeIntrinsics,
        resolution: Resolution,
        clip: ClipRange,
    ) -> Self {
        Self {
            cam_se3_world,
            intrinsics,
            resolution,
            clip,
        }
    }

    /// Camera at `eye` looking at `target`, with `up` giving the image-up
    /// direction in world coordinates.
    pub fn look_at(
        eye: Pt3,
        target: Pt3,
        up: Vec3,
        fov_x: Real,
        resolution: Resolution,
        clip: ClipRange,
    ) -> Result<Self, GeometryError> {
        if !(fov_x > 0.0 && fov_x < std::f64::consts::PI) {
            return Err(GeometryError::DegenerateCamera(
                "field of view must lie in (0, pi)",
            ));
        }
        let forward = (target - eye)
            .try_normalize(1e-12)
            .ok_or(GeometryError::DegenerateCamera("eye and target coincide"))?;
        let right = forward.cross(&up).try_normalize(1e-12).ok_or(
            GeometryError::DegenerateCamera("up vector is parallel to the viewing direction"),
        )?;
        let down = forward.cross(&right);
        let world_r_cam = Rotation3::from_matrix_unchecked(Mat3::from_columns(&[
            right, down, forward,
        ]));
        let world_se3_cam = Iso3::from_parts(
            Translation3::from(eye.coords),
            UnitQuaternion::from_rotation_matrix(&world_r_cam),
        );
        Ok(Self::new(
            world_se3_cam.inverse(),
            PinholeIntrinsics::from_fov_x(fov_x, resolution),
            resolution,
            clip,
        ))
    }

    /// Camera described the way the scene-authoring tool stores it: a world
    /// location, an XYZ Euler rotation (radians) of a camera that looks along
    /// its local −Z with +Y up, and a physical lens/sensor pair.
    pub fn from_blender(
        location: Pt3,
        rotation_euler: [Real; 3],
        focal_mm: Real,
        sensor_width_mm: Real,
        resolution: Resolution,
        clip: ClipRange,
    ) -> Result<Self, GeometryError> {
        if !(focal_mm > 0.0 && sensor_width_mm > 0.0) {
            return Err(GeometryError::DegenerateCamera(
                "focal length and sensor width must be positive",
            ));
        }
        let world_r_tool =
            Rotation3::from_euler_angles(rotation_euler[0], rotation_euler[1], rotation_euler[2]);
        let tool_r_cam = Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI);
        let world_se3_cam = Iso3::from_parts(
            Translation3::from(location.coords),
            UnitQuaternion::from_rotation_matrix(&(world_r_tool * tool_r_cam)),
        );
        Ok(Self::new(
            world_se3_cam.inverse(),
            PinholeIntrinsics::from_focal_mm(focal_mm, sensor_width_mm, resolution),
            resolution,
            clip,
        ))
    }

    /// Camera center in world coordinates.
    pub fn position(&self) -> Pt3 {
        Pt3::from(self.cam_se3_world.inverse().translation.vector)
    }

    /// World point expressed in camera coordinates.
    #[inline]
    pub fn to_camera(&self, p_w: &Pt3) -> Vec3 {
        self.cam_se3_world.transform_point(p_w).coords
    }

    fn axis_world(&self, axis: Vec3) -> Vec3 {
        self.cam_se3_world.rotation.inverse_transform_vector(&axis)
    }

    /// Image-right direction in world coordinates.
    pub fn right(&self) -> Vec3 {
        self.axis_world(Vec3::x())
    }

    /// Image-up direction in world coordinates.
    pub fn up(&self) -> Vec3 {
        -self.axis_world(Vec3::y())
    }

    /// Viewing direction in world coordinates.
    pub fn forward(&self) -> Vec3 {
        self.axis_world(Vec3::z())
    }

    /// Project a world point to pixel coordinates.
    ///
    /// Returns `None` if the point is behind the camera.
    pub fn project_pixel(&self, p_w: &Pt3) -> Option<Pt2> {
        let p_c = self.to_camera(p_w);
        if p_c.z <= BEHIND_EPS {
            return None;
        }
        Some(
            self.intrinsics
                .normalized_to_pixel(&Vec2::new(p_c.x / p_c.z, p_c.y / p_c.z)),
        )
    }

    /// Project a world point to normalized image coordinates.
    ///
    /// Points behind the camera are pushed onto the image border in the
    /// direction of their lateral offset, so every point has a usable
    /// position even when it cannot be seen. A point with no lateral offset
    /// lands on the top edge.
    pub fn project(&self, p_w: &Pt3) -> Projection {
        let p_c = self.to_camera(p_w);
        let in_front = p_c.z > BEHIND_EPS;
        let ray = if in_front {
            Vec2::new(p_c.x / p_c.z, p_c.y / p_c.z)
        } else {
            let lateral = Vec2::new(p_c.x, p_c.y);
            let dir = if lateral.norm() > BEHIND_EPS {
                lateral.normalize()
            } else {
                -Vec2::y()
            };
            dir / BEHIND_EPS
        };
        let px = self.intrinsics.normalized_to_pixel(&ray);
        let n = self.resolution.to_normalized(&px);
        let in_image = in_front && (0.0..=1.0).contains(&n.x) && (0.0..=1.0).contains(&n.y);
        Projection {
            normalized: Pt2::new(clamp_unit(n.x), clamp_unit(n.y)),
            depth: p_c.z,
            in_front,
            in_image,
        }
    }

    /// Whether a world point lies inside the viewing frustum: in front of the
    /// camera, between the clip planes and within the field of view.
    pub fn contains(&self, p_w: &Pt3) -> bool {
        let proj = self.project(p_w);
        proj.in_image && proj.depth >= self.clip.near && proj.depth <= self.clip.far
    }
}

fn clamp_unit(v: Real) -> Real {
    if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) }
}

/// Serializable camera description, as supplied by scene snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CameraPose {
    LookAt {
        eye: Pt3,
        target: Pt3,
        #[serde(default = "default_up")]
        up: Vec3,
        fov_x_deg: Real,
    },
    Blender {
        location: Pt3,
        rotation_euler: [Real; 3],
        focal_mm: Real,
        sensor_width_mm: Real,
    },
}

fn default_up() -> Vec3 {
    Vec3::z()
}

/// A camera pose together with its image geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraSpec {
    pub pose: CameraPose,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub clip: ClipRange,
}

impl CameraSpec {
    /// Validate the description and build the camera.
    pub fn build(&self) -> Result<Camera> {
        self.resolution.validate()?;
        let camera = match &self.pose {
            CameraPose::LookAt {
                eye,
                target,
                up,
                fov_x_deg,
            } => Camera::look_at(
                *eye,
                *target,
                *up,
                fov_x_deg.to_radians(),
                self.resolution,
                self.clip,
            )?,
            CameraPose::Blender {
                location,
                rotation_euler,
                focal_mm,
                sensor_width_mm,
            } => Camera::from_blender(
                *location,
                *rotation_euler,
                *focal_mm,
                *sensor_width_mm,
                self.resolution,
                self.clip,
            )?,
        };
        Ok(camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontal() -> Camera {
        Camera::look_at(
            Pt3::new(0.0, -5.0, 1.0),
            Pt3::new(0.0, 0.0, 1.0),
            Vec3::z(),
            60f64.to_radians(),
            Resolution::default(),
            ClipRange::default(),
        )
        .unwrap()
    }

    #[test]
    fn look_at_axes_and_position() {
        let cam = frontal();
        assert!((cam.position() - Pt3::new(0.0, -5.0, 1.0)).norm() < 1e-12);
        assert!((cam.forward() - Vec3::y()).norm() < 1e-12);
        assert!((cam.right() - Vec3::x()).norm() < 1e-12);
        assert!((cam.up() - Vec3::z()).norm() < 1e-12);
    }

    #[test]
    fn target_projects_to_image_center() {
        let cam = frontal();
        let proj = cam.project(&Pt3::new(0.0, 0.0, 1.0));
        assert!(proj.in_front && proj.in_image);
        assert!((proj.normalized - Pt2::new(0.5, 0.5)).norm() < 1e-12);
        assert!((proj.depth - 5.0).abs() < 1e-12);
        // +X world is image right, +Z world is image up.
        let right = cam.project(&Pt3::new(0.5, 0.0, 1.0));
        let up = cam.project(&Pt3::new(0.0, 0.0, 1.5));
        assert!(right.normalized.x > 0.5);
        assert!(up.normalized.y < 0.5);
    }

    #[test]
    fn points_behind_camera_are_clamped() {
        let cam = frontal();
        let proj = cam.project(&Pt3::new(1.0, -10.0, 1.0));
        assert!(!proj.in_front);
        assert!(!proj.in_image);
        assert!((0.0..=1.0).contains(&proj.normalized.x));
        assert!((0.0..=1.0).contains(&proj.normalized.y));
        assert!(cam.project_pixel(&Pt3::new(1.0, -10.0, 1.0)).is_none());
        assert!(!cam.contains(&Pt3::new(1.0, -10.0, 1.0)));
    }

    #[test]
    fn points_straight_behind_camera_land_on_border() {
        let cam = frontal();
        for p in [Pt3::new(0.0, -10.0, 1.0), Pt3::new(0.0, -5.0, 1.0)] {
            let proj = cam.project(&p);
            assert!(!proj.in_front && !proj.in_image);
            assert!((proj.normalized - Pt2::new(0.5, 0.0)).norm() < 1e-12);
        }
        // Tiny lateral offsets still reach the border.
        let proj = cam.project(&Pt3::new(1e-6, -10.0, 1.0));
        assert_eq!(proj.normalized.x, 1.0);
        assert!(proj.normalized.y > 0.0 && proj.normalized.y < 1.0);
    }

    #[test]
    fn frustum_respects_clip_planes() {
        let mut cam = frontal();
        cam.clip = ClipRange {
            near: 0.1,
            far: 4.0,
        };
        assert!(!cam.contains(&Pt3::new(0.0, 0.0, 1.0)));
        cam.clip.far = 10.0;
        assert!(cam.contains(&Pt3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn blender_camera_matches_look_at() {
        let res = Resolution::default();
        let blender = Camera::from_blender(
            Pt3::new(0.0, -5.0, 1.0),
            [90f64.to_radians(), 0.0, 0.0],
            50.0,
            36.0,
            res,
            ClipRange::default(),
        )
        .unwrap();
        assert!((blender.forward() - Vec3::y()).norm() < 1e-9);
        assert!((blender.up() - Vec3::z()).norm() < 1e-9);
        assert!((blender.right() - Vec3::x()).norm() < 1e-9);
    }

    #[test]
    fn degenerate_look_at_is_rejected() {
        let res = Resolution::default();
        let err = Camera::look_at(
            Pt3::origin(),
            Pt3::new(0.0, 0.0, 3.0),
            Vec3::z(),
            1.0,
            res,
            ClipRange::default(),
        );
        assert!(matches!(err, Err(GeometryError::DegenerateCamera(_))));
    }

    #[test]
    fn camera_spec_from_json() {
        let json = r#"{
            "pose": {"type": "look_at", "eye": [0.0, -5.0, 1.0], "target": [0.0, 0.0, 1.0], "fov_x_deg": 60.0},
            "resolution": {"width": 640, "height": 480}
        }"#;
        let spec: CameraSpec = serde_json::from_str(json).unwrap();
        let cam = spec.build().unwrap();
        assert_eq!(cam.resolution, Resolution::new(640, 480).unwrap());
        assert_eq!(cam.clip, ClipRange::default());
    }

    #[test]
    fn zero_resolution_is_a_config_error() {
        assert!(matches!(
            Resolution::new(0, 10),
            Err(ConfigError::InvalidResolution { .. })
        ));
    }
}
