//! Scene snapshot: objects with oriented bounding volumes and a ray query.
//!
//! The annotation pipeline never talks to a live scene graph. Every core
//! operation receives a [`SceneGeometry`] implementation for the frame being
//! processed; [`Scene`] is the in-memory implementation used by the CLI and
//! the tests.

use serde::{Deserialize, Serialize};

use crate::{Pt3, RaycastError, Real, Vec3, any_orthogonal, centroid};

const AXIS_EPS: Real = 1e-12;

/// Eight corners of a box-shaped bounding volume.
///
/// Corner `i` sits at the `+x` side when bit 0 of `i` is set, at `+y` for bit
/// 1 and at `+z` (up) for bit 2, all relative to the volume's local axes:
///
/// ```text
///  0: (-x,-y,-z)  1: (+x,-y,-z)  2: (-x,+y,-z)  3: (+x,+y,-z)
///  4: (-x,-y,+z)  5: (+x,-y,+z)  6: (-x,+y,+z)  7: (+x,+y,+z)
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "VolumeSpec", into = "VolumeSpec")]
pub struct BoundingVolume {
    corners: [Pt3; 8],
}

impl BoundingVolume {
    /// Build from explicit corners in the documented bit order.
    pub fn from_corners(corners: [Pt3; 8]) -> Self {
        Self { corners }
    }

    /// World axis-aligned box.
    pub fn axis_aligned(min: Pt3, max: Pt3) -> Self {
        Self::oriented(
            nalgebra::center(&min, &max),
            (max - min) * 0.5,
            0.0,
        )
    }

    /// Box with the given center and half extents, rotated by `yaw` radians
    /// about the world +Z axis.
    pub fn oriented(center: Pt3, half_extents: Vec3, yaw: Real) -> Self {
        let (s, c) = yaw.sin_cos();
        let ax = Vec3::new(c, s, 0.0) * half_extents.x;
        let ay = Vec3::new(-s, c, 0.0) * half_extents.y;
        let az = Vec3::z() * half_extents.z;
        let corners = std::array::from_fn(|i| {
            let sx = if i & 1 != 0 { 1.0 } else { -1.0 };
            let sy = if i & 2 != 0 { 1.0 } else { -1.0 };
            let sz = if i & 4 != 0 { 1.0 } else { -1.0 };
            center + ax * sx + ay * sy + az * sz
        });
        Self { corners }
    }

    #[inline]
    pub fn corners(&self) -> &[Pt3; 8] {
        &self.corners
    }

    /// Centroid of the eight corners.
    pub fn center(&self) -> Pt3 {
        centroid(&self.corners)
    }

    /// Full edge lengths along the local x, y and z axes.
    pub fn extents(&self) -> Vec3 {
        let c = &self.corners;
        Vec3::new((c[1] - c[0]).norm(), (c[2] - c[0]).norm(), (c[4] - c[0]).norm())
    }

    /// Local frame of the volume: orthonormal axes and half extents.
    ///
    /// Collapsed edges still get a valid axis so thin volumes stay
    /// intersectable.
    pub fn local_frame(&self) -> LocalFrame {
        let c = &self.corners;
        let ex = c[1] - c[0];
        let ey = c[2] - c[0];
        let ez = c[4] - c[0];
        let x = ex.try_normalize(AXIS_EPS).unwrap_or_else(Vec3::x);
        let y = (ey - x * x.dot(&ey))
            .try_normalize(AXIS_EPS)
            .unwrap_or_else(|| any_orthogonal(&x));
        let z = x.cross(&y);
        LocalFrame {
            center: self.center(),
            axes: [x, y, z],
            half_extents: Vec3::new(
                0.5 * ex.dot(&x).abs(),
                0.5 * ey.dot(&y).abs(),
                0.5 * ez.dot(&z).abs(),
            ),
        }
    }

    /// Slab-method intersection of a ray with the volume.
    ///
    /// `dir` must be unit length. Returns the entry distance in
    /// `[0, max_distance]`. A ray starting inside the volume only leaves it
    /// and never hits it.
    pub fn intersect_ray(&self, origin: &Pt3, dir: &Vec3, max_distance: Real) -> Option<Real> {
        let frame = self.local_frame();
        let rel = origin - frame.center;
        if frame.contains_offset(&rel) {
            return None;
        }
        let mut t_min: Real = 0.0;
        let mut t_max = max_distance;
        for (axis, half) in frame.axes.iter().zip(frame.half_extents.iter()) {
            let o = rel.dot(axis);
            let d = dir.dot(axis);
            if d.abs() < 1e-12 {
                if o < -half || o > *half {
                    return None;
                }
                continue;
            }
            let mut t1 = (-half - o) / d;
            let mut t2 = (half - o) / d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Whether `p` lies inside or on the volume.
    pub fn contains(&self, p: &Pt3) -> bool {
        let frame = self.local_frame();
        frame.contains_offset(&(p - frame.center))
    }
}

/// Orthonormal local frame of a [`BoundingVolume`].
#[derive(Clone, Copy, Debug)]
pub struct LocalFrame {
    pub center: Pt3,
    pub axes: [Vec3; 3],
    pub half_extents: Vec3,
}

impl LocalFrame {
    /// Whether `center + offset` lies inside or on the volume.
    fn contains_offset(&self, offset: &Vec3) -> bool {
        self.axes
            .iter()
            .zip(self.half_extents.iter())
            .all(|(axis, half)| offset.dot(axis).abs() <= *half)
    }
}

/// Accepted serialized forms of a bounding volume.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum VolumeSpec {
    Corners {
        corners: [Pt3; 8],
    },
    Oriented {
        center: Pt3,
        half_extents: Vec3,
        #[serde(default)]
        yaw: Real,
    },
    AxisAligned {
        min: Pt3,
        max: Pt3,
    },
}

impl From<VolumeSpec> for BoundingVolume {
    fn from(spec: VolumeSpec) -> Self {
        match spec {
            VolumeSpec::Corners { corners } => Self::from_corners(corners),
            VolumeSpec::Oriented {
                center,
                half_extents,
                yaw,
            } => Self::oriented(center, half_extents, yaw),
            VolumeSpec::AxisAligned { min, max } => Self::axis_aligned(min, max),
        }
    }
}

impl From<BoundingVolume> for VolumeSpec {
    fn from(volume: BoundingVolume) -> Self {
        VolumeSpec::Corners {
            corners: volume.corners,
        }
    }
}

/// One object of a scene snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneObject {
    /// Unique object identifier (the scene's object name).
    pub id: String,
    /// Class label, matched against the configured categories.
    pub label: String,
    pub volume: BoundingVolume,
    /// Only trackable objects take part in face extraction. Every object can
    /// occlude.
    #[serde(default)]
    pub trackable: bool,
}

impl SceneObject {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        volume: BoundingVolume,
        trackable: bool,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            volume,
            trackable,
        }
    }
}

/// Nearest intersection returned by a ray query.
#[derive(Clone, Debug, PartialEq)]
pub struct RayHit {
    pub distance: Real,
    pub object_id: String,
}

/// Scene-geometry capability consumed by the annotation core.
pub trait SceneGeometry {
    /// Objects of the current snapshot.
    fn objects(&self) -> &[SceneObject];

    /// Nearest intersection of the ray `origin + t * dir` with
    /// `0 <= t <= max_distance`. `dir` is unit length.
    fn cast_ray(
        &self,
        origin: &Pt3,
        dir: &Vec3,
        max_distance: Real,
    ) -> Result<Option<RayHit>, RaycastError>;

    /// Trackable objects, in snapshot order.
    fn trackable_objects(&self) -> Vec<&SceneObject> {
        self.objects().iter().filter(|o| o.trackable).collect()
    }
}

/// In-memory scene snapshot with box-level ray casting.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    /// Objects whose smallest extent is below this size never occlude.
    #[serde(default)]
    pub min_occluder_size: Real,
}

impl Scene {
    pub fn new(objects: Vec<SceneObject>) -> Self {
        Self {
            objects,
            min_occluder_size: 0.0,
        }
    }

    pub fn with_min_occluder_size(mut self, size: Real) -> Self {
        self.min_occluder_size = size;
        self
    }

    pub fn push(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    fn is_occluder(&self, object: &SceneObject) -> bool {
        object.volume.extents().min() >= self.min_occluder_size
    }
}

impl SceneGeometry for Scene {
    fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    fn cast_ray(
        &self,
        origin: &Pt3,
        dir: &Vec3,
        max_distance: Real,
    ) -> Result<Option<RayHit>, RaycastError> {
        if !dir.iter().all(|v| v.is_finite()) || (dir.norm() - 1.0).abs() > 1e-6 {
            return Err(RaycastError::InvalidRay("direction must be a finite unit vector"));
        }
        let mut best: Option<RayHit> = None;
        for object in self.objects.iter().filter(|o| self.is_occluder(o)) {
            let Some(t) = object.volume.intersect_ray(origin, dir, max_distance) else {
                continue;
            };
            if best.as_ref().is_none_or(|b| t < b.distance) {
                best = Some(RayHit {
                    distance: t,
                    object_id: object.id.clone(),
                });
            }
        }
        Ok(best)
    }
}

/// Step taken past a skipped hit before casting again.
const SKIP_STEP: Real = 1e-9;

/// View of a scene in which only trackable objects block rays.
///
/// Hits on other objects are stepped past and the ray is cast again from
/// inside them, so the wrapped scene's own occluder filtering still applies.
#[derive(Clone, Copy, Debug)]
pub struct TrackableOccluders<'a, G: ?Sized>(pub &'a G);

impl<G> SceneGeometry for TrackableOccluders<'_, G>
where
    G: SceneGeometry + ?Sized,
{
    fn objects(&self) -> &[SceneObject] {
        self.0.objects()
    }

    fn cast_ray(
        &self,
        origin: &Pt3,
        dir: &Vec3,
        max_distance: Real,
    ) -> Result<Option<RayHit>, RaycastError> {
        let objects = self.0.objects();
        let mut travelled: Real = 0.0;
        // A box is entered at most once, so every object is skipped at most once.
        for _ in 0..=objects.len() {
            let start = origin + dir * travelled;
            let Some(hit) = self.0.cast_ray(&start, dir, max_distance - travelled)? else {
                return Ok(None);
            };
            let distance = travelled + hit.distance;
            if objects
                .iter()
                .any(|o| o.trackable && o.id == hit.object_id)
            {
                return Ok(Some(RayHit {
                    distance,
                    object_id: hit.object_id,
                }));
            }
            travelled = distance + SKIP_STEP;
            if travelled > max_distance {
                break;
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(id: &str, center: Pt3) -> SceneObject {
        SceneObject::new(
            id,
            "pallet",
            BoundingVolume::oriented(center, Vec3::new(0.5, 0.5, 0.5), 0.0),
            true,
        )
    }

    #[test]
    fn corner_bit_order() {
        let v = BoundingVolume::axis_aligned(Pt3::new(0.0, 0.0, 0.0), Pt3::new(2.0, 4.0, 1.0));
        let c = v.corners();
        assert_eq!(c[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(c[1], Pt3::new(2.0, 0.0, 0.0));
        assert_eq!(c[2], Pt3::new(0.0, 4.0, 0.0));
        assert_eq!(c[4], Pt3::new(0.0, 0.0, 1.0));
        assert_eq!(c[7], Pt3::new(2.0, 4.0, 1.0));
        assert!((v.extents() - Vec3::new(2.0, 4.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn ray_hits_nearest_box() {
        let scene = Scene::new(vec![
            unit_box("far", Pt3::new(0.0, 5.0, 0.0)),
            unit_box("near", Pt3::new(0.0, 2.0, 0.0)),
        ]);
        let hit = scene
            .cast_ray(&Pt3::origin(), &Vec3::y(), 10.0)
            .unwrap()
            .unwrap();
        assert_eq!(hit.object_id, "near");
        assert!((hit.distance - 1.5).abs() < 1e-12);
    }

    #[test]
    fn ray_respects_max_distance_and_misses() {
        let scene = Scene::new(vec![unit_box("a", Pt3::new(0.0, 5.0, 0.0))]);
        assert!(scene.cast_ray(&Pt3::origin(), &Vec3::y(), 4.0).unwrap().is_none());
        assert!(scene.cast_ray(&Pt3::origin(), &Vec3::x(), 10.0).unwrap().is_none());
        assert!(Scene::default()
            .cast_ray(&Pt3::origin(), &Vec3::y(), 10.0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn rotated_box_intersection() {
        let v = BoundingVolume::oriented(
            Pt3::new(0.0, 3.0, 0.0),
            Vec3::new(1.0, 0.1, 1.0),
            std::f64::consts::FRAC_PI_4,
        );
        // Thin plate rotated 45 degrees: a ray along +Y crosses it near y = 3.
        let t = v.intersect_ray(&Pt3::origin(), &Vec3::y(), 10.0).unwrap();
        assert!((t - (3.0 - 0.1 * 2f64.sqrt())).abs() < 1e-9, "t = {t}");
    }

    #[test]
    fn enclosing_volume_does_not_block_rays_from_inside() {
        let hall = SceneObject::new(
            "hall",
            "hall",
            BoundingVolume::oriented(Pt3::new(0.0, 0.0, 4.0), Vec3::new(20.0, 20.0, 5.0), 0.0),
            false,
        );
        assert!(hall.volume.contains(&Pt3::origin()));
        assert!(hall.volume.intersect_ray(&Pt3::origin(), &Vec3::y(), 30.0).is_none());

        let scene = Scene::new(vec![hall, unit_box("inner", Pt3::new(0.0, 3.0, 0.0))]);
        let hit = scene
            .cast_ray(&Pt3::origin(), &Vec3::y(), 10.0)
            .unwrap()
            .unwrap();
        assert_eq!(hit.object_id, "inner");
        assert!(scene.cast_ray(&Pt3::origin(), &Vec3::x(), 10.0).unwrap().is_none());

        // From outside the hall its wall is still an ordinary hit.
        let outside = Pt3::new(0.0, -30.0, 0.0);
        let t = scene.objects[0]
            .volume
            .intersect_ray(&outside, &Vec3::y(), 60.0)
            .unwrap();
        assert!((t - 10.0).abs() < 1e-9);
    }

    #[test]
    fn trackable_view_skips_other_objects() {
        let wall = SceneObject::new(
            "wall",
            "wall",
            BoundingVolume::oriented(Pt3::new(0.0, 2.0, 0.0), Vec3::new(3.0, 0.1, 3.0), 0.0),
            false,
        );
        let scene = Scene::new(vec![
            wall,
            unit_box("near", Pt3::new(0.0, 4.0, 0.0)),
            unit_box("far", Pt3::new(0.0, 8.0, 0.0)),
        ]);
        let all = scene.cast_ray(&Pt3::origin(), &Vec3::y(), 20.0).unwrap().unwrap();
        assert_eq!(all.object_id, "wall");

        let view = TrackableOccluders(&scene);
        assert_eq!(view.trackable_objects().len(), 2);
        let hit = view.cast_ray(&Pt3::origin(), &Vec3::y(), 20.0).unwrap().unwrap();
        assert_eq!(hit.object_id, "near");
        assert!((hit.distance - 3.5).abs() < 1e-6);
        assert!(view.cast_ray(&Pt3::origin(), &Vec3::y(), 3.0).unwrap().is_none());
        assert!(view.cast_ray(&Pt3::origin(), &Vec3::x(), 20.0).unwrap().is_none());
    }

    #[test]
    fn small_objects_do_not_occlude() {
        let mut small = unit_box("small", Pt3::new(0.0, 2.0, 0.0));
        small.volume = BoundingVolume::oriented(Pt3::new(0.0, 2.0, 0.0), Vec3::repeat(0.05), 0.0);
        let scene = Scene::new(vec![small]).with_min_occluder_size(0.2);
        assert!(scene.cast_ray(&Pt3::origin(), &Vec3::y(), 10.0).unwrap().is_none());
    }

    #[test]
    fn invalid_direction_is_rejected() {
        let scene = Scene::default();
        assert!(scene
            .cast_ray(&Pt3::origin(), &Vec3::new(0.0, 2.0, 0.0), 1.0)
            .is_err());
    }

    #[test]
    fn volume_json_forms() {
        let aabb: BoundingVolume =
            serde_json::from_str(r#"{"min": [0, 0, 0], "max": [1, 1, 1]}"#).unwrap();
        let obb: BoundingVolume = serde_json::from_str(
            r#"{"center": [0.5, 0.5, 0.5], "half_extents": [0.5, 0.5, 0.5]}"#,
        )
        .unwrap();
        for (a, b) in aabb.corners().iter().zip(obb.corners()) {
            assert!((a - b).norm() < 1e-12);
        }
        let json = serde_json::to_string(&aabb).unwrap();
        let back: BoundingVolume = serde_json::from_str(&json).unwrap();
        assert_eq!(back, aabb);
    }
}
