//! Deterministic synthetic scenes and camera paths.
//!
//! The helpers avoid `thread_rng` and do not depend on the internal algorithm
//! of `rand` RNGs, so generated scenes stay identical across versions and
//! platforms. They back the tests and the CLI's `--synthetic` mode.

use crate::{
    BoundingVolume, Camera, ClipRange, GeometryError, Pt3, Real, Resolution, Scene, SceneObject,
    Vec3,
};

/// Size of a 1200 x 800 x 144 mm pallet, in meters.
pub const PALLET_SIZE: [Real; 3] = [1.2, 0.8, 0.144];

fn pallet_half_extents() -> Vec3 {
    Vec3::from(PALLET_SIZE) * 0.5
}

/// One pallet standing on the floor at the origin.
pub fn single_pallet() -> Scene {
    Scene::new(vec![pallet("pallet_000", Pt3::new(0.0, 0.0, 0.0), 0.0)])
}

/// A pallet with its bottom face at `floor` height.
pub fn pallet(id: impl Into<String>, floor: Pt3, yaw: Real) -> SceneObject {
    let half = pallet_half_extents();
    let center = floor + Vec3::z() * half.z;
    SceneObject::new(
        id,
        "pallet",
        BoundingVolume::oriented(center, half, yaw),
        true,
    )
}

/// Layout parameters of [`warehouse`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarehouseLayout {
    /// Distance between pallet centers along x.
    pub spacing_x: Real,
    /// Distance between pallet centers along y.
    pub spacing_y: Real,
    /// Maximum absolute yaw jitter (radians).
    pub max_yaw: Real,
    /// Maximum absolute position jitter (meters).
    pub max_offset: Real,
    /// Fraction of pallets carrying a box load.
    pub load_probability: Real,
}

impl Default for WarehouseLayout {
    fn default() -> Self {
        Self {
            spacing_x: 2.0,
            spacing_y: 1.8,
            max_yaw: 0.15,
            max_offset: 0.1,
            load_probability: 0.5,
        }
    }
}

/// A floor grid of `rows x cols` pallets with jittered pose, optional box
/// loads and a support column at each grid corner.
///
/// Boxes and columns occlude but are not trackable.
pub fn warehouse(seed: u64, rows: usize, cols: usize) -> Scene {
    warehouse_with(seed, rows, cols, WarehouseLayout::default())
}

/// [`warehouse`] with an explicit layout.
pub fn warehouse_with(seed: u64, rows: usize, cols: usize, layout: WarehouseLayout) -> Scene {
    let mut scene = Scene::default();
    let x0 = -0.5 * layout.spacing_x * cols.saturating_sub(1) as Real;
    let y0 = -0.5 * layout.spacing_y * rows.saturating_sub(1) as Real;

    for row in 0..rows {
        for col in 0..cols {
            let n = row * cols + col;
            let mut stream = Stream::new(seed, n as u64);
            let dx = stream.symmetric(layout.max_offset);
            let dy = stream.symmetric(layout.max_offset);
            let yaw = stream.symmetric(layout.max_yaw);
            let floor = Pt3::new(
                x0 + col as Real * layout.spacing_x + dx,
                y0 + row as Real * layout.spacing_y + dy,
                0.0,
            );
            let object = pallet(format!("pallet_{n:03}"), floor, yaw);

            if stream.unit() < layout.load_probability {
                let height = 0.3 + 0.9 * stream.unit();
                let half = Vec3::new(0.55, 0.35, 0.5 * height);
                let center = floor + Vec3::z() * (PALLET_SIZE[2] + half.z);
                scene.push(SceneObject::new(
                    format!("box_{n:03}"),
                    "box",
                    BoundingVolume::oriented(center, half, yaw),
                    false,
                ));
            }
            scene.push(object);
        }
    }

    if rows > 0 && cols > 0 {
        let margin_x = 0.5 * layout.spacing_x;
        let margin_y = 0.5 * layout.spacing_y;
        let xs = [x0 - margin_x, -x0 + margin_x];
        let ys = [y0 - margin_y, -y0 + margin_y];
        for (i, (x, y)) in xs
            .iter()
            .flat_map(|x| ys.iter().map(move |y| (*x, *y)))
            .enumerate()
        {
            scene.push(SceneObject::new(
                format!("column_{i}"),
                "column",
                BoundingVolume::oriented(Pt3::new(x, y, 2.5), Vec3::new(0.15, 0.15, 2.5), 0.0),
                false,
            ));
        }
    }
    scene
}

/// Camera path parameters for [`orbit_cameras`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub center: Pt3,
    pub radius: Real,
    /// Camera height above `center`.
    pub height: Real,
    /// Horizontal field of view (radians).
    pub fov_x: Real,
    pub resolution: Resolution,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            center: Pt3::origin(),
            radius: 6.0,
            height: 1.5,
            fov_x: 60f64.to_radians(),
            resolution: Resolution::default(),
        }
    }
}

/// `count` cameras evenly spaced on a circle, all looking at the orbit
/// center. The first camera sits on the −Y side of the center.
pub fn orbit_cameras(orbit: &Orbit, count: usize) -> Result<Vec<Camera>, GeometryError> {
    (0..count)
        .map(|i| {
            let angle = -std::f64::consts::FRAC_PI_2
                + std::f64::consts::TAU * i as Real / count.max(1) as Real;
            let eye = orbit.center
                + Vec3::new(
                    orbit.radius * angle.cos(),
                    orbit.radius * angle.sin(),
                    orbit.height,
                );
            Camera::look_at(
                eye,
                orbit.center,
                Vec3::z(),
                orbit.fov_x,
                orbit.resolution,
                ClipRange::default(),
            )
        })
        .collect()
}

/// Deterministic SplitMix64 stream keyed by `(seed, index)`.
struct Stream {
    state: u64,
}

impl Stream {
    fn new(seed: u64, index: u64) -> Self {
        Self {
            state: seed ^ index.wrapping_mul(0xBF58_476D_1CE4_E5B9),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)` from the top 53 bits.
    fn unit(&mut self) -> Real {
        (self.next_u64() >> 11) as Real * (1.0 / (1u64 << 53) as Real)
    }

    /// Uniform in `[-max_abs, max_abs)`.
    fn symmetric(&mut self, max_abs: Real) -> Real {
        (self.unit() - 0.5) * 2.0 * max_abs.abs()
    }
}
