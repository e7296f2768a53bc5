//! Mathematical utilities and type definitions.
//!
//! This module provides the fundamental linear algebra types used throughout
//! the workspace and a few small geometric helpers.

use nalgebra::{Isometry3, Matrix3, Point2, Point3, Vector2, Vector3};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Arithmetic mean of a non-empty set of points.
///
/// Returns the origin for an empty slice.
pub fn centroid(points: &[Pt3]) -> Pt3 {
    if points.is_empty() {
        return Pt3::origin();
    }
    let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Pt3::from(sum / points.len() as Real)
}

/// Midpoint of the segment `a`–`b`.
#[inline]
pub fn midpoint(a: &Pt3, b: &Pt3) -> Pt3 {
    Pt3::from((a.coords + b.coords) * 0.5)
}

/// Area of a planar (or nearly planar) quadrilateral `a, b, c, d` given in
/// winding order.
///
/// Uses half the norm of the cross product of the diagonals, which is exact
/// for planar quads and insensitive to the starting vertex.
pub fn quad_area(a: &Pt3, b: &Pt3, c: &Pt3, d: &Pt3) -> Real {
    let d1 = c - a;
    let d2 = d - b;
    0.5 * d1.cross(&d2).norm()
}

/// Return a unit vector orthogonal to `v`.
///
/// `v` is expected to be non-zero; the result is stable for any direction.
pub fn any_orthogonal(v: &Vec3) -> Vec3 {
    let helper = if v.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    v.cross(&helper).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_area_of_unit_square() {
        let a = Pt3::new(0.0, 0.0, 0.0);
        let b = Pt3::new(1.0, 0.0, 0.0);
        let c = Pt3::new(1.0, 0.0, 1.0);
        let d = Pt3::new(0.0, 0.0, 1.0);
        assert!((quad_area(&a, &b, &c, &d) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn centroid_and_midpoint_agree_for_two_points() {
        let a = Pt3::new(1.0, 2.0, 3.0);
        let b = Pt3::new(3.0, 2.0, 1.0);
        assert_eq!(centroid(&[a, b]), midpoint(&a, &b));
    }

    #[test]
    fn orthogonal_vector_is_unit_and_orthogonal() {
        for v in [Vec3::x(), Vec3::y(), Vec3::new(0.3, -2.0, 0.5)] {
            let o = any_orthogonal(&v);
            assert!((o.norm() - 1.0).abs() < 1e-12);
            assert!(o.dot(&v).abs() < 1e-12);
        }
    }
}
