//! Side faces of an object's bounding volume.
//!
//! Only the four vertical sides are produced. Top and bottom faces of
//! ground-supported objects are almost never usable labels.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{GeometryError, Pt3, Real, SceneObject, Vec3, centroid, quad_area};

/// Faces whose area falls below this value (m²) are treated as degenerate.
pub const MIN_FACE_AREA: Real = 1e-6;

/// Which side of the volume a face lies on, in the volume's local axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceSide {
    /// Local −Y side.
    Front,
    /// Local +Y side.
    Back,
    /// Local −X side.
    Left,
    /// Local +X side.
    Right,
}

impl FaceSide {
    pub const ALL: [FaceSide; 4] = [Self::Front, Self::Back, Self::Left, Self::Right];

    /// Corner indices in winding order: two bottom corners then the two top
    /// corners above them in reverse, so consecutive indices share an edge.
    fn corner_indices(self) -> [usize; 4] {
        match self {
            Self::Front => [0, 1, 5, 4],
            Self::Back => [3, 2, 6, 7],
            Self::Left => [2, 0, 4, 6],
            Self::Right => [1, 3, 7, 5],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for FaceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A planar side quad of one object, recomputed for every frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub object_id: String,
    pub side: FaceSide,
    /// Corners in winding order.
    pub corners: [Pt3; 4],
    /// Unit normal pointing away from the volume's centroid.
    pub normal: Vec3,
    pub area: Real,
}

impl Face {
    pub fn center(&self) -> Pt3 {
        centroid(&self.corners)
    }

    /// Center, corners and edge midpoints; the points probed by face-level
    /// occlusion tests.
    pub fn sample_points(&self) -> Vec<Pt3> {
        let mut pts = Vec::with_capacity(9);
        pts.push(self.center());
        pts.extend_from_slice(&self.corners);
        for i in 0..4 {
            pts.push(crate::midpoint(&self.corners[i], &self.corners[(i + 1) % 4]));
        }
        pts
    }
}

/// Extract the four side faces of `object`.
///
/// Returns an empty vector for degenerate volumes; callers skip such objects.
pub fn extract_faces(object: &SceneObject) -> Vec<Face> {
    match try_extract_faces(object) {
        Ok(faces) => faces.to_vec(),
        Err(err) => {
            debug!("skipping faces of `{}`: {err}", object.id);
            Vec::new()
        }
    }
}

/// Extract the four side faces of `object`, in [`FaceSide::ALL`] order.
///
/// # Errors
///
/// [`GeometryError::DegenerateVolume`] when any side face has an area below
/// [`MIN_FACE_AREA`].
pub fn try_extract_faces(object: &SceneObject) -> Result<[Face; 4], GeometryError> {
    let corners = object.volume.corners();
    let volume_center = object.volume.center();

    let mut faces = Vec::with_capacity(4);
    for side in FaceSide::ALL {
        let quad = side.corner_indices().map(|i| corners[i]);
        let area = quad_area(&quad[0], &quad[1], &quad[2], &quad[3]);
        if !(area >= MIN_FACE_AREA) {
            return Err(GeometryError::DegenerateVolume {
                object_id: object.id.clone(),
                area,
            });
        }
        let e1 = quad[1] - quad[0];
        let e2 = quad[3] - quad[0];
        let mut normal = e1
            .cross(&e2)
            .try_normalize(Real::EPSILON)
            .ok_or_else(|| GeometryError::DegenerateVolume {
                object_id: object.id.clone(),
                area,
            })?;
        if normal.dot(&(centroid(&quad) - volume_center)) < 0.0 {
            normal = -normal;
        }
        faces.push(Face {
            object_id: object.id.clone(),
            side,
            corners: quad,
            normal,
            area,
        });
    }

    faces
        .try_into()
        .map_err(|_| GeometryError::DegenerateVolume {
            object_id: object.id.clone(),
            area: 0.0,
        })
}
