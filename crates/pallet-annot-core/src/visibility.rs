//! Line-of-sight and orientation tests.
//!
//! Two independent checks: a point test that casts a ray from the camera
//! center through scene geometry, and a face test that looks only at the face
//! orientation and the frustum. A front-facing face may still have occluded
//! keypoints.

use log::warn;

use crate::{Camera, Face, Pt3, RaycastError, Real, SceneGeometry};

/// Whether nothing in the scene blocks the segment from the camera center to
/// `point`.
///
/// Hits closer than `epsilon` to the point itself are ignored so a point on
/// an object's surface is not hidden by that same surface. A failing ray
/// query is reported and the point is treated as visible.
pub fn is_point_visible<G>(scene: &G, point: &Pt3, camera: &Camera, epsilon: Real) -> bool
where
    G: SceneGeometry + ?Sized,
{
    match line_of_sight(scene, point, camera, epsilon) {
        Ok(visible) => visible,
        Err(err) => {
            warn!("ray query failed, treating point {point:?} as visible: {err}");
            true
        }
    }
}

/// Fallible form of [`is_point_visible`].
pub fn line_of_sight<G>(
    scene: &G,
    point: &Pt3,
    camera: &Camera,
    epsilon: Real,
) -> Result<bool, RaycastError>
where
    G: SceneGeometry + ?Sized,
{
    let origin = camera.position();
    let to_point = point - origin;
    let distance = to_point.norm();
    if distance <= epsilon {
        return Ok(true);
    }
    let dir = to_point / distance;
    let hit = scene.cast_ray(&origin, &dir, distance)?;
    Ok(hit.is_none_or(|h| h.distance >= distance - epsilon))
}

/// Whether `face` points toward the camera and its center lies inside the
/// frustum.
pub fn is_face_front_facing(face: &Face, camera: &Camera) -> bool {
    let center = face.center();
    let view = center - camera.position();
    face.normal.dot(&view) < 0.0 && camera.contains(&center)
}

/// Cosine between the face normal and the direction from the face to the
/// camera. `1` for a face seen head-on, `<= 0` for a face turned away.
pub fn face_alignment(face: &Face, camera: &Camera) -> Real {
    let to_camera = camera.position() - face.center();
    match to_camera.try_normalize(Real::EPSILON) {
        Some(dir) => face.normal.dot(&dir),
        None => 0.0,
    }
}

/// Fraction of the face's sample points hidden by scene geometry.
///
/// Ray failures count as visible, matching [`is_point_visible`].
pub fn face_occlusion_ratio<G>(scene: &G, face: &Face, camera: &Camera, epsilon: Real) -> Real
where
    G: SceneGeometry + ?Sized,
{
    let samples = face.sample_points();
    let hidden = samples
        .iter()
        .filter(|p| !is_point_visible(scene, p, camera, epsilon))
        .count();
    hidden as Real / samples.len() as Real
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BoundingVolume, ClipRange, RayHit, Resolution, Scene, SceneObject, Vec3, extract_faces,
    };

    fn camera() -> Camera {
        Camera::look_at(
            Pt3::new(0.0, -6.0, 0.5),
            Pt3::new(0.0, 0.0, 0.5),
            Vec3::z(),
            60f64.to_radians(),
            Resolution::default(),
            ClipRange::default(),
        )
        .unwrap()
    }

    fn block(id: &str, center: Pt3) -> SceneObject {
        SceneObject::new(
            id,
            "pallet",
            BoundingVolume::oriented(center, Vec3::new(0.5, 0.5, 0.5), 0.0),
            true,
        )
    }

    struct Broken;

    impl SceneGeometry for Broken {
        fn objects(&self) -> &[SceneObject] {
            &[]
        }

        fn cast_ray(&self, _: &Pt3, _: &Vec3, _: Real) -> Result<Option<RayHit>, RaycastError> {
            Err(RaycastError::BackendUnavailable("offline".into()))
        }
    }

    #[test]
    fn empty_scene_is_fully_visible() {
        let scene = Scene::default();
        assert!(is_point_visible(&scene, &Pt3::new(0.0, 0.0, 0.5), &camera(), 1e-3));
    }

    #[test]
    fn interposed_object_hides_point() {
        let target = Pt3::new(0.0, 0.0, 0.5);
        let mut scene = Scene::new(vec![block("blocker", Pt3::new(0.0, -3.0, 0.5))]);
        assert!(!is_point_visible(&scene, &target, &camera(), 1e-3));
        scene.objects.clear();
        assert!(is_point_visible(&scene, &target, &camera(), 1e-3));
    }

    #[test]
    fn surface_point_is_not_self_occluded() {
        let object = block("self", Pt3::new(0.0, 0.0, 0.5));
        let scene = Scene::new(vec![object.clone()]);
        let front = Pt3::new(0.2, -0.5, 0.7);
        assert!(is_point_visible(&scene, &front, &camera(), 1e-3));
        let back = Pt3::new(0.2, 0.5, 0.7);
        assert!(!is_point_visible(&scene, &back, &camera(), 1e-3));
    }

    #[test]
    fn ray_failure_degrades_to_visible() {
        assert!(is_point_visible(&Broken, &Pt3::origin(), &camera(), 1e-3));
        assert!(line_of_sight(&Broken, &Pt3::origin(), &camera(), 1e-3).is_err());
    }

    #[test]
    fn only_camera_side_face_is_front_facing() {
        let object = block("a", Pt3::new(0.0, 0.0, 0.5));
        let faces = extract_faces(&object);
        let cam = camera();
        let front: Vec<_> = faces
            .iter()
            .filter(|f| is_face_front_facing(f, &cam))
            .map(|f| f.side)
            .collect();
        assert_eq!(front, vec![crate::FaceSide::Front]);
        let f = faces.iter().find(|f| f.side == crate::FaceSide::Front).unwrap();
        assert!((face_alignment(f, &cam) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn occlusion_ratio_counts_hidden_samples() {
        let object = block("a", Pt3::new(0.0, 0.0, 0.5));
        let face = extract_faces(&object)
            .into_iter()
            .find(|f| f.side == crate::FaceSide::Front)
            .unwrap();
        let open = Scene::new(vec![object.clone()]);
        assert_eq!(face_occlusion_ratio(&open, &face, &camera(), 1e-3), 0.0);
        let wall = SceneObject::new(
            "wall",
            "wall",
            BoundingVolume::oriented(Pt3::new(0.0, -2.0, 0.5), Vec3::new(3.0, 0.1, 3.0), 0.0),
            false,
        );
        let blocked = Scene::new(vec![object, wall]);
        assert_eq!(face_occlusion_ratio(&blocked, &face, &camera(), 1e-3), 1.0);
    }
}
