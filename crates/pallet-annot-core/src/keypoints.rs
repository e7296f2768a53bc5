//! Six ordered keypoints per selected face.
//!
//! Order: top-center, bottom-center, top-left, top-right, bottom-left,
//! bottom-right. Corner roles come from the camera's image axes, so "left"
//! always means left in the rendered image.

use serde::{Deserialize, Serialize};

use crate::{Camera, Face, Pt2, Pt3, Real, SceneGeometry, is_point_visible, midpoint};

/// Number of keypoints per face.
pub const KEYPOINT_COUNT: usize = 6;

/// Role of a keypoint on its face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointKind {
    TopCenter,
    BottomCenter,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl KeypointKind {
    /// All kinds in label order.
    pub const ORDER: [KeypointKind; KEYPOINT_COUNT] = [
        Self::TopCenter,
        Self::BottomCenter,
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    /// Position of this kind in [`Self::ORDER`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::TopCenter => "top_center",
            Self::BottomCenter => "bottom_center",
            Self::TopLeft => "top_left",
            Self::TopRight => "top_right",
            Self::BottomLeft => "bottom_left",
            Self::BottomRight => "bottom_right",
        }
    }
}

/// Two-state keypoint visibility.
///
/// Encoded as `2` (visible) or `0` (hidden). The `1` state of some keypoint
/// formats ("labeled but not visible") is never produced; consumers of
/// existing datasets rely on the two-state encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn flag(self) -> u8 {
        match self {
            Self::Visible => 2,
            Self::Hidden => 0,
        }
    }

    /// Inverse of [`Self::flag`]. Only `0` and `2` are accepted.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            2 => Some(Self::Visible),
            0 => Some(Self::Hidden),
            _ => None,
        }
    }

    #[inline]
    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}

/// One labeled point of a face.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub kind: KeypointKind,
    pub position_3d: Pt3,
    /// Normalized image position in `[0, 1]`, best effort for hidden points.
    pub position_2d: Pt2,
    pub visibility: Visibility,
}

/// Options controlling keypoint visibility.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeypointOptions {
    /// Cast rays against the scene; otherwise only the frustum decides.
    pub check_visibility: bool,
    /// Self-occlusion tolerance for the ray test.
    pub epsilon: Real,
}

/// Compute the six keypoints of `face` as seen by `camera`.
pub fn make_keypoints<G>(
    face: &Face,
    camera: &Camera,
    scene: &G,
    options: KeypointOptions,
) -> [Keypoint; KEYPOINT_COUNT]
where
    G: SceneGeometry + ?Sized,
{
    let [top_left, top_right, bottom_left, bottom_right] = order_corners(face, camera);
    let positions = [
        midpoint(&top_left, &top_right),
        midpoint(&bottom_left, &bottom_right),
        top_left,
        top_right,
        bottom_left,
        bottom_right,
    ];

    std::array::from_fn(|i| {
        let position_3d = positions[i];
        let projection = camera.project(&position_3d);
        let visible = camera.contains(&position_3d)
            && (!options.check_visibility
                || is_point_visible(scene, &position_3d, camera, options.epsilon));
        Keypoint {
            kind: KeypointKind::ORDER[i],
            position_3d,
            position_2d: projection.normalized,
            visibility: if visible {
                Visibility::Visible
            } else {
                Visibility::Hidden
            },
        }
    })
}

/// Face corners as `[top-left, top-right, bottom-left, bottom-right]` in the
/// camera's image axes.
///
/// Of the quad's two pairs of opposite edges, the pair whose connecting
/// direction is best aligned with the camera's up axis gives the top and
/// bottom edges. Corners on each edge are then ordered by image x, falling
/// back to the camera's right axis when a corner is behind the camera.
pub fn order_corners(face: &Face, camera: &Camera) -> [Pt3; 4] {
    let [a, b, c, d] = face.corners;
    let up = camera.up();

    // Opposite edges in winding order: (a, b) / (d, c) and (b, c) / (a, d).
    // `rise` is the cosine between the edge-to-edge direction and camera up.
    let split = |e1: (Pt3, Pt3), e2: (Pt3, Pt3)| {
        let across = midpoint(&e1.0, &e1.1) - midpoint(&e2.0, &e2.1);
        let rise = across.dot(&up) / across.norm().max(Real::EPSILON);
        if rise >= 0.0 { (e1, e2, rise) } else { (e2, e1, -rise) }
    };
    let (top1, bottom1, rise1) = split((d, c), (a, b));
    let (top2, bottom2, rise2) = split((a, d), (b, c));
    let (top, bottom) = if rise1 >= rise2 {
        (top1, bottom1)
    } else {
        (top2, bottom2)
    };

    let (tl, tr) = left_to_right(top, camera);
    let (bl, br) = left_to_right(bottom, camera);
    [tl, tr, bl, br]
}

fn left_to_right((p, q): (Pt3, Pt3), camera: &Camera) -> (Pt3, Pt3) {
    let pc = camera.to_camera(&p);
    let qc = camera.to_camera(&q);
    let p_left = if pc.z > 0.0 && qc.z > 0.0 {
        pc.x / pc.z <= qc.x / qc.z
    } else {
        let right = camera.right();
        p.coords.dot(&right) <= q.coords.dot(&right)
    };
    if p_left { (p, q) } else { (q, p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BoundingVolume, ClipRange, FaceSide, Resolution, Scene, SceneObject, Vec3, extract_faces,
    };

    const OPTS: KeypointOptions = KeypointOptions {
        check_visibility: true,
        epsilon: 1e-3,
    };

    fn setup() -> (SceneObject, Camera) {
        let object = SceneObject::new(
            "p",
            "pallet",
            BoundingVolume::oriented(Pt3::new(0.0, 0.0, 0.3), Vec3::new(0.6, 0.4, 0.3), 0.0),
            true,
        );
        let cam = Camera::look_at(
            Pt3::new(0.0, -5.0, 0.8),
            Pt3::new(0.0, 0.0, 0.3),
            Vec3::z(),
            60f64.to_radians(),
            Resolution::default(),
            ClipRange::default(),
        )
        .unwrap();
        (object, cam)
    }

    fn front(object: &SceneObject) -> Face {
        extract_faces(object)
            .into_iter()
            .find(|f| f.side == FaceSide::Front)
            .unwrap()
    }

    #[test]
    fn six_keypoints_in_label_order() {
        let (object, cam) = setup();
        let scene = Scene::new(vec![object.clone()]);
        let kps = make_keypoints(&front(&object), &cam, &scene, OPTS);
        let kinds: Vec<_> = kps.iter().map(|k| k.kind).collect();
        assert_eq!(kinds, KeypointKind::ORDER.to_vec());

        // Corners in world coordinates: front face spans x in [-0.6, 0.6], z in [0, 0.6].
        assert!((kps[2].position_3d - Pt3::new(-0.6, -0.4, 0.6)).norm() < 1e-12);
        assert!((kps[3].position_3d - Pt3::new(0.6, -0.4, 0.6)).norm() < 1e-12);
        assert!((kps[4].position_3d - Pt3::new(-0.6, -0.4, 0.0)).norm() < 1e-12);
        assert!((kps[5].position_3d - Pt3::new(0.6, -0.4, 0.0)).norm() < 1e-12);

        for k in &kps {
            assert_eq!(k.visibility, Visibility::Visible, "{:?}", k.kind);
        }
        // Image layout agrees with the labels.
        assert!(kps[2].position_2d.x < kps[3].position_2d.x);
        assert!(kps[2].position_2d.y < kps[4].position_2d.y);
    }

    #[test]
    fn midpoints_average_their_corners() {
        let (object, cam) = setup();
        let kps = make_keypoints(&front(&object), &cam, &Scene::default(), OPTS);
        let top = midpoint(&kps[2].position_3d, &kps[3].position_3d);
        let bottom = midpoint(&kps[4].position_3d, &kps[5].position_3d);
        assert!((kps[0].position_3d - top).norm() < 1e-12);
        assert!((kps[1].position_3d - bottom).norm() < 1e-12);
    }

    #[test]
    fn occluder_hides_some_keypoints() {
        let (object, cam) = setup();
        // A post in front of the left half of the face.
        let post = SceneObject::new(
            "post",
            "column",
            BoundingVolume::oriented(Pt3::new(-0.39, -2.0, 0.5), Vec3::new(0.15, 0.15, 2.0), 0.0),
            false,
        );
        let scene = Scene::new(vec![object.clone(), post]);
        let kps = make_keypoints(&front(&object), &cam, &scene, OPTS);
        assert_eq!(kps[KeypointKind::TopLeft.index()].visibility, Visibility::Hidden);
        assert_eq!(kps[KeypointKind::BottomLeft.index()].visibility, Visibility::Hidden);
        assert_eq!(kps[KeypointKind::TopRight.index()].visibility, Visibility::Visible);

        let unchecked = KeypointOptions {
            check_visibility: false,
            ..OPTS
        };
        let kps = make_keypoints(&front(&object), &cam, &scene, unchecked);
        assert!(kps.iter().all(|k| k.visibility.is_visible()));
    }

    #[test]
    fn points_outside_image_are_hidden_and_clamped() {
        let (object, _) = setup();
        // Camera looking away from the face: every keypoint is behind it.
        let cam = Camera::look_at(
            Pt3::new(0.0, -5.0, 0.8),
            Pt3::new(0.0, -10.0, 0.8),
            Vec3::z(),
            60f64.to_radians(),
            Resolution::default(),
            ClipRange::default(),
        )
        .unwrap();
        let kps = make_keypoints(&front(&object), &cam, &Scene::default(), OPTS);
        for k in &kps {
            assert_eq!(k.visibility, Visibility::Hidden);
            assert!((0.0..=1.0).contains(&k.position_2d.x));
            assert!((0.0..=1.0).contains(&k.position_2d.y));
        }
    }

    #[test]
    fn grazing_view_keeps_top_edge_on_top() {
        let low = SceneObject::new(
            "low",
            "pallet",
            BoundingVolume::oriented(Pt3::new(0.0, 0.0, 0.072), Vec3::new(0.6, 0.4, 0.072), 0.0),
            true,
        );
        let cam = Camera::look_at(
            Pt3::new(1.5, -6.0, 2.5),
            Pt3::new(0.0, 0.0, 0.0),
            Vec3::z(),
            60f64.to_radians(),
            Resolution::default(),
            ClipRange::default(),
        )
        .unwrap();
        for face in extract_faces(&low) {
            let [tl, tr, bl, br] = order_corners(&face, &cam);
            assert!((tl.z - 0.144).abs() < 1e-12 && (tr.z - 0.144).abs() < 1e-12);
            assert!(bl.z.abs() < 1e-12 && br.z.abs() < 1e-12);
            // Left corners share a vertical edge.
            assert!((tl.xy() - bl.xy()).norm() < 1e-12);
        }
    }

    #[test]
    fn visibility_flags() {
        assert_eq!(Visibility::Visible.flag(), 2);
        assert_eq!(Visibility::Hidden.flag(), 0);
        assert_eq!(Visibility::from_flag(1), None);
        assert_eq!(Visibility::from_flag(2), Some(Visibility::Visible));
    }
}
