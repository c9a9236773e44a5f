use super::{Bvh, BvhLeaf, BvhNode, CullingMask};
use crate::bounding_volume::Aabb;

impl<T> Bvh<T> {
    /// Stores a new leaf and returns its index.
    ///
    /// Leaf indices are assigned sequentially starting at 0. The new leaf isn’t part of the tree
    /// until the next [`Bvh::build`] or [`Bvh::rebuild`], so queries won’t report it before that.
    pub fn add(&mut self, aabb: Aabb, data: T, mask: CullingMask) -> u32 {
        let leaf_index = self.data.len() as u32;
        self.data.push(BvhLeaf::new(aabb, data, mask));
        leaf_index
    }

    /// Stores a new leaf belonging to every culling group and returns its index.
    ///
    /// See [`Bvh::add`].
    pub fn add_with_default_mask(&mut self, aabb: Aabb, data: T) -> u32 {
        self.add(aabb, data, CullingMask::default())
    }

    /// Lets `on_leaf` modify every stored leaf.
    ///
    /// The closure receives the AABB, payload, and mask of each leaf and must return `true` if
    /// it modified the AABB or the mask. The tree nodes of the modified leaves are marked as
    /// outdated: the tree is stale until the next [`Bvh::refit`] or [`Bvh::rebuild`], so queries
    /// may miss moved leaves in the meantime.
    pub fn update(&mut self, mut on_leaf: impl FnMut(&mut Aabb, &mut T, &mut CullingMask) -> bool) {
        for (leaf_index, leaf) in self.data.iter_mut().enumerate() {
            if !on_leaf(&mut leaf.aabb, &mut leaf.data, &mut leaf.mask) {
                continue;
            }

            // Leaves added since the last build don’t have a node yet.
            if let Some(&node_id) = self.leaf_nodes.get(leaf_index) {
                let node = &mut self.nodes[node_id as usize];

                if !node.is_outdated() {
                    node.status = BvhNode::OUTDATED;
                    self.workspace.outdated_leaves.push(node_id);
                }
            }
        }
    }

    /// Removes the leaf with the given index and returns its payload.
    ///
    /// The last leaf takes the removed leaf’s index. The tree is discarded and must be rebuilt
    /// with [`Bvh::build`] or [`Bvh::rebuild`] before queries see any leaf again.
    ///
    /// Panics if `leaf_index` is out of bounds.
    pub fn erase(&mut self, leaf_index: u32) -> T {
        let leaf = self.data.swap_remove(leaf_index as usize);
        self.discard_tree();
        leaf.data
    }

    /// Only keeps the leaves for which `keep` returns `true`.
    ///
    /// The remaining leaves keep their relative order and are re-indexed from 0. If any leaf
    /// was removed, the tree is discarded and must be rebuilt.
    pub fn retain(&mut self, mut keep: impl FnMut(&BvhLeaf<T>) -> bool) {
        let len = self.data.len();
        self.data.retain(|leaf| keep(leaf));

        if self.data.len() != len {
            self.discard_tree();
        }
    }

    /// Removes every leaf and node.
    pub fn clear(&mut self) {
        self.data.clear();
        self.discard_tree();
    }

    fn discard_tree(&mut self) {
        self.nodes.clear();
        self.parents.clear();
        self.leaf_nodes.clear();
        self.workspace.outdated_leaves.clear();
        self.accumulated_refit_delta = 0.0;
        self.reference_half_area = 0.0;
    }
}
