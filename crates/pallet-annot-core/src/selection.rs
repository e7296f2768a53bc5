//! Per-object face selection.
//!
//! Candidates must face the camera, have their center inside the frustum,
//! cover enough pixels and (optionally) not be hidden behind other geometry.
//! Survivors are ranked by camera distance with orientation as tie-break and
//! the best `max_faces_per_object` are kept.

use std::cmp::Ordering;

use log::debug;

use crate::{
    AnnotationConfig, Camera, Face, Real, SceneGeometry, face_alignment, face_occlusion_ratio,
    is_face_front_facing,
};

/// A face that passed the orientation and size filters, with its ranking
/// data.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceCandidate {
    pub face: Face,
    /// Distance from the camera center to the face center.
    pub distance: Real,
    /// Cosine between the face normal and the direction to the camera.
    pub alignment: Real,
    /// Area of the projected 2D bounding box, in pixels.
    pub area_px: Real,
}

/// Area in pixels of the 2D box enclosing the projected face corners.
pub fn projected_area_px(face: &Face, camera: &Camera) -> Real {
    let mut min = [Real::INFINITY; 2];
    let mut max = [Real::NEG_INFINITY; 2];
    for corner in &face.corners {
        let n = camera.project(corner).normalized;
        for (axis, v) in [n.x, n.y].into_iter().enumerate() {
            min[axis] = min[axis].min(v);
            max[axis] = max[axis].max(v);
        }
    }
    let w = (max[0] - min[0]) * camera.resolution.width as Real;
    let h = (max[1] - min[1]) * camera.resolution.height as Real;
    w * h
}

/// Select at most `config.max_faces_per_object` faces of one object, best
/// first.
///
/// Zero selected faces is a normal outcome.
pub fn select_faces<G>(
    faces: &[Face],
    camera: &Camera,
    scene: &G,
    config: &AnnotationConfig,
) -> Vec<Face>
where
    G: SceneGeometry + ?Sized,
{
    select_candidates(faces, camera, scene, config)
        .into_iter()
        .map(|c| c.face)
        .collect()
}

/// Like [`select_faces`], keeping the ranking data of each selected face.
pub fn select_candidates<G>(
    faces: &[Face],
    camera: &Camera,
    scene: &G,
    config: &AnnotationConfig,
) -> Vec<FaceCandidate>
where
    G: SceneGeometry + ?Sized,
{
    let camera_center = camera.position();
    let mut candidates: Vec<FaceCandidate> = faces
        .iter()
        .filter_map(|face| {
            if !is_face_front_facing(face, camera) {
                return None;
            }
            let alignment = face_alignment(face, camera);
            if alignment < config.face_confidence_threshold {
                debug!(
                    "{}/{}: alignment {alignment:.3} below threshold",
                    face.object_id, face.side
                );
                return None;
            }
            let area_px = projected_area_px(face, camera);
            if area_px < config.min_face_area_px {
                debug!(
                    "{}/{}: projected area {area_px:.1}px below minimum",
                    face.object_id, face.side
                );
                return None;
            }
            Some(FaceCandidate {
                distance: (face.center() - camera_center).norm(),
                face: face.clone(),
                alignment,
                area_px,
            })
        })
        .collect();

    order_candidates(&mut candidates, config.distance_tie_tolerance);

    let test_occlusion = config.check_visibility && config.occlusion.enabled;
    let mut selected = Vec::with_capacity(config.max_faces_per_object);
    for candidate in candidates {
        if selected.len() >= config.max_faces_per_object {
            break;
        }
        if test_occlusion {
            let ratio =
                face_occlusion_ratio(scene, &candidate.face, camera, config.occlusion.epsilon);
            if ratio > config.occlusion.max_occluded_ratio {
                debug!(
                    "{}/{}: occluded ({:.0}% of samples hidden)",
                    candidate.face.object_id,
                    candidate.face.side,
                    ratio * 100.0
                );
                continue;
            }
        }
        selected.push(candidate);
    }
    selected
}

/// Order candidates by distance; runs of candidates within `tolerance` of
/// the run's nearest member are ordered by stronger alignment, then side.
fn order_candidates(candidates: &mut [FaceCandidate], tolerance: Real) {
    candidates.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.face.side.cmp(&b.face.side))
    });
    let mut start = 0;
    while start < candidates.len() {
        let nearest = candidates[start].distance;
        let end = candidates[start..]
            .iter()
            .position(|c| c.distance - nearest > tolerance)
            .map_or(candidates.len(), |n| start + n);
        candidates[start..end].sort_by(tie_break);
        start = end;
    }
}

fn tie_break(a: &FaceCandidate, b: &FaceCandidate) -> Ordering {
    b.alignment
        .total_cmp(&a.alignment)
        .then_with(|| a.face.side.cmp(&b.face.side))
}
