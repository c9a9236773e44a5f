use super::bvh_traverse::TRAVERSAL_STACK_SIZE;
use super::{Bvh, BvhNode, CullingMask};
use crate::bounding_volume::BoundingVolume;
use smallvec::SmallVec;

type PairStack = SmallVec<[(u32, u32); TRAVERSAL_STACK_SIZE]>;

impl<T> Bvh<T> {
    /// Reports every pair of leaves from `self` and `other` with intersecting AABBs.
    ///
    /// A pair is only reported if the mask of the leaf from `self` shares a bit with `mask` and
    /// the mask of the leaf from `other` shares a bit with `mask_other`. The closure receives
    /// the leaf index and payload from `self` first, then from `other`.
    ///
    /// This traverses the Bounding Volume Test Tree of both trees: when both nodes of a pair
    /// are internal, the one with the larger surface area is split. `other` may be `self`, in
    /// which case each leaf is reported with itself and every overlapping pair is reported in
    /// both orders (see [`Bvh::query_self_pairs`] to get each pair once).
    pub fn query_bvh<U>(
        &self,
        other: &Bvh<U>,
        mask: CullingMask,
        mask_other: CullingMask,
        mut on_overlap: impl FnMut(u32, &T, u32, &U),
    ) {
        if self.nodes.is_empty() || other.nodes.is_empty() {
            return;
        }

        let mut stack = PairStack::new();
        stack.push((0, 0));
        traverse_node_pairs(
            &self.nodes,
            &other.nodes,
            mask,
            mask_other,
            &mut stack,
            |leaf1, leaf2| {
                let leaf1_data = &self.data[leaf1 as usize];
                let leaf2_data = &other.data[leaf2 as usize];

                if leaf1_data.mask.intersects(mask)
                    && leaf2_data.mask.intersects(mask_other)
                    && leaf1_data.aabb.intersects(&leaf2_data.aabb)
                {
                    on_overlap(leaf1, &leaf1_data.data, leaf2, &leaf2_data.data);
                }
            },
        );
    }

    /// Reports every unordered pair of distinct leaves of this tree with intersecting AABBs.
    ///
    /// Each pair is reported exactly once, and only if both leaf masks share a bit with
    /// `mask`.
    pub fn query_self_pairs(&self, mask: CullingMask, mut on_overlap: impl FnMut(u32, &T, u32, &T)) {
        let mut stack = PairStack::new();

        // Two distinct leaves have a single lowest common ancestor, and lie on different sides
        // of it. Testing the left and right subtrees of each internal node against each other
        // thus enumerates every pair once.
        for node in &self.nodes {
            let Some([left, right]) = node.children() else {
                continue;
            };

            if !node.matches_mask(mask) {
                continue;
            }

            stack.clear();
            stack.push((left, right));
            traverse_node_pairs(
                &self.nodes,
                &self.nodes,
                mask,
                mask,
                &mut stack,
                |leaf1, leaf2| {
                    let leaf1_data = &self.data[leaf1 as usize];
                    let leaf2_data = &self.data[leaf2 as usize];

                    if leaf1_data.mask.intersects(mask)
                        && leaf2_data.mask.intersects(mask)
                        && leaf1_data.aabb.intersects(&leaf2_data.aabb)
                    {
                        on_overlap(leaf1, &leaf1_data.data, leaf2, &leaf2_data.data);
                    }
                },
            );
        }
    }
}

/// Traverses the pairs of nodes from `nodes1` and `nodes2` reachable from the pairs initially in
/// `stack`, calling `on_leaf_pair` on every pair of leaves with intersecting node bounds.
fn traverse_node_pairs(
    nodes1: &[BvhNode],
    nodes2: &[BvhNode],
    mask1: CullingMask,
    mask2: CullingMask,
    stack: &mut PairStack,
    mut on_leaf_pair: impl FnMut(u32, u32),
) {
    while let Some((id1, id2)) = stack.pop() {
        let node1 = &nodes1[id1 as usize];
        let node2 = &nodes2[id2 as usize];

        if !node1.matches_mask(mask1) || !node2.matches_mask(mask2) || !node1.intersects(node2) {
            continue;
        }

        match (node1.children(), node2.children()) {
            (None, None) => on_leaf_pair(node1.child_offset, node2.child_offset),
            (None, Some([left2, right2])) => {
                stack.push((id1, right2));
                stack.push((id1, left2));
            }
            (Some([left1, right1]), None) => {
                stack.push((right1, id2));
                stack.push((left1, id2));
            }
            (Some([left1, right1]), Some([left2, right2])) => {
                // Split the larger node.
                if node1.half_area() >= node2.half_area() {
                    stack.push((right1, id2));
                    stack.push((left1, id2));
                } else {
                    stack.push((id1, right2));
                    stack.push((id1, left2));
                }
            }
        }
    }
}
