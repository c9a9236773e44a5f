use crate::bounding_volume::Aabb;
use crate::math::{Point, Real};

/// Computes the AABB of a set of points.
///
/// Returns [`Aabb::new_invalid`] if the iterator is empty.
pub fn local_point_cloud_aabb<I>(pts: I) -> Aabb
where
    I: IntoIterator<Item = Point<Real>>,
{
    let mut it = pts.into_iter();

    if let Some(pt) = it.next() {
        let mut min: Point<Real> = pt;
        let mut max: Point<Real> = pt;

        for pt in it {
            min = min.inf(&pt);
            max = max.sup(&pt);
        }

        Aabb::new(min, max)
    } else {
        Aabb::new_invalid()
    }
}
