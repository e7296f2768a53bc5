//! Per-frame annotation: extraction, selection and keypoints for every
//! trackable object of one scene snapshot.

use log::{debug, warn};

use crate::{
    AnnotationConfig, Camera, Detection, Frame, GeometryError, KeypointOptions, Occluders,
    SceneGeometry, TrackableOccluders, make_keypoints, select_faces, try_extract_faces,
};

/// Annotate one frame.
///
/// Objects with a degenerate volume or a label without a configured category
/// are skipped with a warning. A scene without trackable objects yields an
/// empty frame.
pub fn annotate_frame<G>(
    scene: &G,
    camera: &Camera,
    frame_index: usize,
    config: &AnnotationConfig,
) -> Frame
where
    G: SceneGeometry + ?Sized,
{
    match config.occlusion.occluders {
        Occluders::All => annotate_with(scene, camera, frame_index, config),
        Occluders::Trackable => {
            annotate_with(&TrackableOccluders(scene), camera, frame_index, config)
        }
    }
}

fn annotate_with<G>(
    scene: &G,
    camera: &Camera,
    frame_index: usize,
    config: &AnnotationConfig,
) -> Frame
where
    G: SceneGeometry + ?Sized,
{
    let mut frame = Frame::new(frame_index, camera.clone());
    let trackable = scene.trackable_objects();
    if trackable.is_empty() {
        warn!("{}", GeometryError::NoTrackableObjects { frame_index });
        return frame;
    }

    let options = KeypointOptions {
        check_visibility: config.check_visibility,
        epsilon: config.occlusion.epsilon,
    };

    for object in trackable {
        let Some(category) = config.category_for(&object.label) else {
            warn!(
                "frame {frame_index}: skipping `{}`, no category for label `{}`",
                object.id, object.label
            );
            continue;
        };
        let faces = match try_extract_faces(object) {
            Ok(faces) => faces,
            Err(err) => {
                warn!("frame {frame_index}: skipping `{}`: {err}", object.id);
                continue;
            }
        };
        let selected = select_faces(&faces, camera, scene, config);
        debug!(
            "frame {frame_index}: `{}` -> {} face(s) selected",
            object.id,
            selected.len()
        );
        for face in selected {
            let keypoints = make_keypoints(&face, camera, scene, options);
            frame
                .detections
                .push(Detection::new(category.id, face, keypoints));
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoundingVolume, ClipRange, Pt3, Resolution, Scene, SceneObject, Vec3};

    fn camera() -> Camera {
        Camera::look_at(
            Pt3::new(0.0, -5.0, 0.6),
            Pt3::new(0.0, 0.0, 0.3),
            Vec3::z(),
            60f64.to_radians(),
            Resolution::default(),
            ClipRange::default(),
        )
        .unwrap()
    }

    fn object(id: &str, label: &str, half: Vec3) -> SceneObject {
        SceneObject::new(
            id,
            label,
            BoundingVolume::oriented(Pt3::new(0.0, 0.0, 0.3), half, 0.0),
            true,
        )
    }

    #[test]
    fn empty_scene_gives_empty_frame() {
        let frame = annotate_frame(&Scene::default(), &camera(), 7, &AnnotationConfig::default());
        assert_eq!(frame.index, 7);
        assert!(frame.is_empty());
        assert_eq!(frame.file_stem(), "frame_000007");
    }

    #[test]
    fn unknown_labels_and_degenerate_volumes_are_skipped() {
        let scene = Scene::new(vec![
            object("crate", "crate", Vec3::new(0.6, 0.4, 0.3)),
            object("flat", "pallet", Vec3::new(0.6, 0.4, 0.0)),
        ]);
        let frame = annotate_frame(&scene, &camera(), 0, &AnnotationConfig::default());
        assert!(frame.is_empty());
    }

    #[test]
    fn detections_carry_category_and_object() {
        let scene = Scene::new(vec![object("p0", "pallet", Vec3::new(0.6, 0.4, 0.3))]);
        let frame = annotate_frame(&scene, &camera(), 3, &AnnotationConfig::default());
        assert_eq!(frame.detections.len(), 1);
        let det = &frame.detections[0];
        assert_eq!(det.object_id, "p0");
        assert_eq!(det.class_id, 0);
        assert_eq!(det.visible_keypoints(), 6);
        assert_eq!(frame.resolution, Resolution::default());
    }

    #[test]
    fn trackable_occluders_ignore_walls() {
        let target = object("p0", "pallet", Vec3::new(0.6, 0.4, 0.3));
        let wall = SceneObject::new(
            "wall",
            "wall",
            BoundingVolume::oriented(Pt3::new(0.0, -2.0, 1.0), Vec3::new(3.0, 0.1, 1.0), 0.0),
            false,
        );
        let scene = Scene::new(vec![target, wall]);
        let all = AnnotationConfig::default();
        assert!(annotate_frame(&scene, &camera(), 0, &all).is_empty());

        let mut trackable = AnnotationConfig::default();
        trackable.occlusion.occluders = Occluders::Trackable;
        let frame = annotate_frame(&scene, &camera(), 0, &trackable);
        assert_eq!(frame.detections.len(), 1);
        assert_eq!(frame.detections[0].visible_keypoints(), 6);
    }

    #[test]
    fn trackable_occluders_still_block_behind_pallets() {
        let front = object("p0", "pallet", Vec3::new(0.6, 0.4, 0.3));
        let hidden = SceneObject::new(
            "p1",
            "pallet",
            BoundingVolume::oriented(Pt3::new(0.0, 3.0, 0.3), Vec3::new(0.3, 0.2, 0.15), 0.0),
            true,
        );
        let scene = Scene::new(vec![front, hidden]);
        let mut config = AnnotationConfig::default();
        config.occlusion.occluders = Occluders::Trackable;
        let frame = annotate_frame(&scene, &camera(), 0, &config);
        assert_eq!(frame.detections.len(), 1);
        assert_eq!(frame.detections[0].object_id, "p0");
    }
}
