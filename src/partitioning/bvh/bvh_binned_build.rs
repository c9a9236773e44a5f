use super::bvh_build::partition_in_place;
use super::bvh_tree::BvhBuildItem;
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Real, DIM};

// PERF: calculate an optimal bin count dynamically based on the number of leaves to split?
//       The paper suggests (4 + 2 * sqrt(num_leaves).floor()).min(16)
const NUM_BINS: usize = 16;
const BIN_EPSILON: Real = 1.0e-5;

#[derive(Copy, Clone, Debug)]
struct BvhBin {
    aabb: Aabb,
    leaf_count: u32,
}

impl Default for BvhBin {
    fn default() -> Self {
        Self {
            aabb: Aabb::new_invalid(),
            leaf_count: 0,
        }
    }
}

/// Maps item centers along one axis to a bin index.
#[derive(Copy, Clone, Debug)]
struct BinMapping {
    axis: usize,
    k0: Real,
    k1: Real,
}

impl BinMapping {
    #[inline]
    fn bin(&self, item: &BvhBuildItem) -> usize {
        ((self.k1 * (item.center[self.axis] - self.k0)) as usize).min(NUM_BINS - 1)
    }
}

/// Finds the split plane minimizing the Surface Area Heuristic among the bin boundaries of
/// every axis, then partitions `items` accordingly.
///
/// The cost of a split is `A_left * N_left + A_right * N_right` where `A` is the half surface
/// area of the bounds of each side. Returns `None` if no boundary leaves both sides non-empty.
pub(super) fn split_binned_sah(items: &mut [BvhBuildItem]) -> Option<(usize, usize)> {
    assert!(items.len() > 1);

    let centroid_aabb = Aabb::from_points(items.iter().map(|item| item.center));
    let mut best: Option<(Real, BinMapping, usize)> = None;

    for axis in 0..DIM {
        let bins_range = [centroid_aabb.mins[axis], centroid_aabb.maxs[axis]];

        if bins_range[1] <= bins_range[0] {
            // All the centers project on the same coordinate.
            continue;
        }

        let mapping = BinMapping {
            axis,
            k0: bins_range[0],
            k1: NUM_BINS as Real * (1.0 - BIN_EPSILON) / (bins_range[1] - bins_range[0]),
        };

        // Compute bins characteristics.
        let mut bins = [BvhBin::default(); NUM_BINS];
        for item in &*items {
            let bin = &mut bins[mapping.bin(item)];
            bin.aabb.merge(&item.aabb);
            bin.leaf_count += 1;
        }

        // Select the best splitting plane (there are NUM_BINS - 1 splitting planes) based on SAH.
        let mut right_merges = bins;
        let mut right_acc = bins[NUM_BINS - 1];

        for i in 1..NUM_BINS - 1 {
            right_acc.aabb.merge(&right_merges[NUM_BINS - 1 - i].aabb);
            right_acc.leaf_count += right_merges[NUM_BINS - 1 - i].leaf_count;
            right_merges[NUM_BINS - 1 - i] = right_acc;
        }

        let mut left_merge = bins[0];

        for i in 0..NUM_BINS - 1 {
            let right = &right_merges[i + 1];

            if left_merge.leaf_count > 0 && right.leaf_count > 0 {
                let cost = left_merge.aabb.half_area() * left_merge.leaf_count as Real
                    + right.aabb.half_area() * right.leaf_count as Real;

                if best.map_or(true, |(best_cost, ..)| cost < best_cost) {
                    best = Some((cost, mapping, i));
                }
            }

            left_merge.aabb.merge(&bins[i + 1].aabb);
            left_merge.leaf_count += bins[i + 1].leaf_count;
        }
    }

    let (_, mapping, plane) = best?;
    let mid = partition_in_place(items, |item| mapping.bin(item) <= plane);
    Some((mapping.axis, mid))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{Point, Vector};
    use alloc::vec::Vec;

    fn item(leaf: u32, center: Point<Real>) -> BvhBuildItem {
        BvhBuildItem {
            aabb: Aabb::from_half_extents(center, Vector::repeat(0.1)),
            center,
            leaf,
        }
    }

    #[test]
    fn sah_separates_two_clusters() {
        // Two clusters far apart along z, spread a bit along x.
        let mut items: Vec<_> = (0..8)
            .map(|i| {
                let z = if i % 2 == 0 { 0.0 } else { 50.0 };
                item(i, Point::new(i as Real * 0.5, 0.0, z))
            })
            .collect();
        let (axis, mid) = split_binned_sah(&mut items).unwrap();
        assert_eq!(axis, 2);
        assert_eq!(mid, 4);
        assert!(items[..mid].iter().all(|it| it.center.z == 0.0));
        assert!(items[mid..].iter().all(|it| it.center.z == 50.0));
    }

    #[test]
    fn sah_rejects_coincident_centers() {
        let mut items: Vec<_> = (0..4).map(|i| item(i, Point::origin())).collect();
        assert!(split_binned_sah(&mut items).is_none());
    }
}
