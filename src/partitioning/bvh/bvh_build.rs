use super::bvh_tree::{BvhBuildItem, BvhBuildTask};
use super::{Bvh, BvhBuildStrategy, BvhLeaf, BvhNode};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::Real;
use ordered_float::OrderedFloat;

impl<T> Bvh<T> {
    /// Creates a new BVH from the given leaves and builds it with the given strategy.
    ///
    /// The leaf indices are the positions of the leaves in the iterator.
    pub fn from_leaves<It>(strategy: BvhBuildStrategy, leaves: It) -> Self
    where
        It: IntoIterator<Item = BvhLeaf<T>>,
    {
        let mut result = Self::new();
        result.data.extend(leaves);
        result.build(strategy);
        result
    }

    /// Fully builds the tree from all the leaves currently stored.
    ///
    /// Any previous node arena is discarded. Every stored leaf (including the ones added since
    /// the last build) becomes visible to queries. The accumulated refit delta is reset and the
    /// cost of the new tree becomes the reference for [`Bvh::relative_refit_delta`].
    ///
    /// Building a BVH with `n > 0` leaves always results in exactly `2 * n - 1` nodes.
    pub fn build(&mut self, strategy: BvhBuildStrategy) {
        let mut items = core::mem::take(&mut self.workspace.build_items);
        let mut tasks = core::mem::take(&mut self.workspace.build_tasks);
        items.clear();
        tasks.clear();
        items.extend(self.data.iter().enumerate().map(|(i, leaf)| BvhBuildItem {
            aabb: leaf.aabb,
            center: leaf.aabb.center(),
            leaf: i as u32,
        }));

        self.nodes.clear();
        self.parents.clear();
        self.leaf_nodes.clear();
        self.leaf_nodes.resize(self.data.len(), u32::MAX);
        self.workspace.outdated_leaves.clear();

        if !items.is_empty() {
            self.nodes.reserve(items.len() * 2 - 1);
            self.parents.reserve(items.len() * 2 - 1);
            self.nodes.push(BvhNode::zeros());
            self.parents.push(Self::NO_PARENT);
            tasks.push(BvhBuildTask {
                node: 0,
                start: 0,
                end: items.len(),
            });
        }

        // Emit the topology top-down. The bounds of internal nodes are computed afterward.
        while let Some(task) = tasks.pop() {
            let range = &mut items[task.start..task.end];

            if let [item] = range {
                self.nodes[task.node as usize] =
                    BvhNode::leaf(&item.aabb, item.leaf, self.data[item.leaf as usize].mask);
                self.leaf_nodes[item.leaf as usize] = task.node;
                continue;
            }

            let (axis, mid) = split_range(strategy, range);
            let first_child = self.nodes.len() as u32;
            self.nodes.push(BvhNode::zeros());
            self.nodes.push(BvhNode::zeros());
            self.parents.push(task.node);
            self.parents.push(task.node);

            let node = &mut self.nodes[task.node as usize];
            node.child_offset = first_child;
            node.axis = axis as i8;

            tasks.push(BvhBuildTask {
                node: first_child + 1,
                start: task.start + mid,
                end: task.end,
            });
            tasks.push(BvhBuildTask {
                node: first_child,
                start: task.start,
                end: task.start + mid,
            });
        }

        // Children are always stored after their parent.
        for id in (0..self.nodes.len() as u32).rev() {
            if !self.nodes[id as usize].is_leaf() {
                self.nodes[id as usize] = self.merged_children(id);
            }
        }

        self.workspace.build_items = items;
        self.workspace.build_tasks = tasks;
        self.accumulated_refit_delta = 0.0;
        self.reference_half_area = self.internal_half_area();

        log::trace!(
            "Built BVH with {} leaves, {} nodes, depth {} ({:?}).",
            self.data.len(),
            self.nodes.len(),
            self.subtree_depth(0),
            strategy
        );

        debug_assert_eq!(self.check_well_formed(), Ok(()));
    }
}

/// Splits `items` in two non-empty parts.
///
/// Returns the split axis and the number of items of the left part.
fn split_range(strategy: BvhBuildStrategy, items: &mut [BvhBuildItem]) -> (usize, usize) {
    debug_assert!(items.len() > 1);

    let split = match strategy {
        BvhBuildStrategy::EqualCount => None,
        BvhBuildStrategy::Middle => split_middle(items),
        BvhBuildStrategy::AreaWeighted => split_area_weighted(items),
        BvhBuildStrategy::SurfaceAreaHeuristic => super::bvh_binned_build::split_binned_sah(items),
    };

    // Strategies bail out on degenerate configurations (all the centers on one side of the
    // plane, coincident centers, etc.) and fall back to the median.
    split.unwrap_or_else(|| split_equal_count(items))
}

/// Bounding box of the centers of `items`.
fn centroid_aabb(items: &[BvhBuildItem]) -> Aabb {
    Aabb::from_points(items.iter().map(|item| item.center))
}

/// Total order on the items along an axis. Ties are broken by leaf index for determinism.
#[inline]
fn axis_key(item: &BvhBuildItem, axis: usize) -> (OrderedFloat<Real>, u32) {
    (OrderedFloat(item.center[axis]), item.leaf)
}

/// Moves the items satisfying `is_left` to the front of the slice.
///
/// Returns the number of such items.
pub(super) fn partition_in_place(
    items: &mut [BvhBuildItem],
    mut is_left: impl FnMut(&BvhBuildItem) -> bool,
) -> usize {
    let mut mid = 0;

    for i in 0..items.len() {
        if is_left(&items[i]) {
            items.swap(i, mid);
            mid += 1;
        }
    }

    mid
}

fn split_equal_count(items: &mut [BvhBuildItem]) -> (usize, usize) {
    let axis = centroid_aabb(items).largest_axis();
    let mid = items.len() / 2;
    let _ = items.select_nth_unstable_by_key(mid, |item| axis_key(item, axis));
    (axis, mid)
}

fn split_middle(items: &mut [BvhBuildItem]) -> Option<(usize, usize)> {
    let bounds = items
        .iter()
        .fold(Aabb::new_invalid(), |acc, item| acc.merged(&item.aabb));
    let axis = bounds.largest_axis();
    let plane = bounds.center()[axis];
    let mid = partition_in_place(items, |item| item.center[axis] < plane);
    (mid != 0 && mid != items.len()).then_some((axis, mid))
}

fn split_area_weighted(items: &mut [BvhBuildItem]) -> Option<(usize, usize)> {
    let axis = centroid_aabb(items).largest_axis();
    items.sort_unstable_by_key(|item| axis_key(item, axis));

    let total_area: Real = items.iter().map(|item| item.aabb.half_area()).sum();

    if total_area <= 0.0 {
        // Flat or point-like leaves carry no area information.
        return None;
    }

    let mut area = 0.0;

    for (i, item) in items[..items.len() - 1].iter().enumerate() {
        area += item.aabb.half_area();

        if area * 2.0 >= total_area {
            return Some((axis, i + 1));
        }
    }

    Some((axis, items.len() - 1))
}
