//! Traits and structure needed to cast rays.

use crate::math::{Point, Real, Vector, DIM};

/// A ray for ray-casting queries.
///
/// A ray is a half-infinite line starting at an origin point and extending
/// in a direction. Points along the ray are `origin + dir * t` for `t ≥ 0`.
///
/// The direction does **not** need to be normalized. If it isn't, every time of impact
/// is scaled by `dir.norm()`.
///
/// # Example
///
/// ```rust
/// use canopy3d::query::Ray;
/// use nalgebra::{Point3, Vector3};
///
/// let ray = Ray::new(Point3::new(0.0, 5.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
/// assert_eq!(ray.point_at(2.0), Point3::new(2.0, 5.0, 0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Ray {
    /// Starting point of the ray.
    pub origin: Point<Real>,
    /// Direction vector of the ray.
    pub dir: Vector<Real>,
}

impl Ray {
    /// Creates a new ray from an origin point and direction vector.
    pub fn new(origin: Point<Real>, dir: Vector<Real>) -> Ray {
        Ray { origin, dir }
    }

    /// Computes a point along the ray at parameter `t`.
    #[inline]
    pub fn point_at(&self, t: Real) -> Point<Real> {
        self.origin + self.dir * t
    }
}

/// A ray with its inverse direction precomputed.
///
/// Slab tests against many boxes (like during a BVH traversal) only need one division per
/// axis when they share the same `InvRay`.
#[derive(Debug, Clone, Copy)]
pub struct InvRay {
    /// Starting point of the ray.
    pub origin: Point<Real>,
    /// Direction vector of the ray.
    pub dir: Vector<Real>,
    /// The component-wise inverse of `dir`.
    ///
    /// Components where `dir` is zero are set to zero and must not be used.
    pub inv_dir: Vector<Real>,
}

impl From<Ray> for InvRay {
    fn from(ray: Ray) -> Self {
        let inv_dir = ray.dir.map(|r| if r == 0.0 { 0.0 } else { 1.0 / r });
        Self {
            origin: ray.origin,
            dir: ray.dir,
            inv_dir,
        }
    }
}

impl InvRay {
    /// Is the direction of this ray negative along the given axis?
    ///
    /// Used to order the children of a BVH node from nearest to farthest.
    #[inline]
    pub fn is_negative_along(&self, axis: usize) -> bool {
        debug_assert!(axis < DIM);
        self.dir[axis] < 0.0
    }
}

/// Traits of objects which can be intersected by a ray.
pub trait RayCast {
    /// Computes the time of impact between this shape and a ray.
    ///
    /// Returns the entry time of the ray into this shape, or zero if the ray starts inside
    /// of it. Returns `None` if there is no hit before `max_time_of_impact`.
    fn cast_local_ray(&self, ray: &Ray, max_time_of_impact: Real) -> Option<Real> {
        self.cast_local_inv_ray(&InvRay::from(*ray), max_time_of_impact)
    }

    /// Same as [`RayCast::cast_local_ray`] but with the inverse direction already computed.
    fn cast_local_inv_ray(&self, ray: &InvRay, max_time_of_impact: Real) -> Option<Real>;

    /// Tests whether a ray intersects this shape.
    #[inline]
    fn intersects_local_ray(&self, ray: &Ray, max_time_of_impact: Real) -> bool {
        self.cast_local_ray(ray, max_time_of_impact).is_some()
    }
}
