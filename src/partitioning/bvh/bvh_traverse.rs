use super::{Bvh, BvhNode, CullingMask};
use smallvec::SmallVec;

pub(super) const TRAVERSAL_STACK_SIZE: usize = 32;

/// Iterator over the indices of the leaves of a [`Bvh`], in depth-first order.
///
/// Created by [`Bvh::leaves`].
pub struct Leaves<'a, T, Check: Fn(&BvhNode) -> bool> {
    tree: &'a Bvh<T>,
    stack: SmallVec<[u32; TRAVERSAL_STACK_SIZE]>,
    check: Check,
}

impl<'a, T, Check: Fn(&BvhNode) -> bool> Leaves<'a, T, Check> {
    /// Starts iterating from the root of `tree`.
    pub fn new(tree: &'a Bvh<T>, check: Check) -> Leaves<'a, T, Check> {
        let mut stack = SmallVec::default();

        if !tree.nodes.is_empty() {
            stack.push(0);
        }

        Leaves { tree, stack, check }
    }
}

impl<T, Check: Fn(&BvhNode) -> bool> Iterator for Leaves<'_, T, Check> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = &self.tree.nodes[id as usize];

            if !(self.check)(node) {
                continue;
            }

            match node.children() {
                None => return Some(node.child_offset),
                Some([left, right]) => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }

        None
    }
}

/// Controls the execution flow of [`Bvh::traverse`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraversalAction {
    /// The traversal will continue on the children of the tested node.
    Continue,
    /// The traversal will skip all descendants of the tested node.
    Prune,
    /// The traversal will exit immediately.
    EarlyExit,
}

impl<T> Bvh<T> {
    #[inline(always)]
    pub(super) fn traversal_stack() -> SmallVec<[u32; TRAVERSAL_STACK_SIZE]> {
        Default::default()
    }

    /// Iterates through the leaves, in depth-first order.
    ///
    /// The `check_node` closure is called on every traversed node. If it returns `false` then the
    /// node and all its descendants won’t be iterated on. This is useful for pruning whole
    /// sub-trees based on a geometric predicate on the node’s AABB.
    ///
    /// See also the [`Bvh::traverse`] function which is slightly less convenient since it doesn’t
    /// rely on the iterator system, but takes a closure that implements [`FnMut`] instead of [`Fn`].
    pub fn leaves<F: Fn(&BvhNode) -> bool>(&self, check_node: F) -> Leaves<'_, T, F> {
        Leaves::new(self, check_node)
    }

    /// Traverses the BVH in depth-first order with full control over traversal.
    ///
    /// `check_node` is called on every visited node, starting with the root, and decides what
    /// happens next:
    /// - [`TraversalAction::Continue`] visits the node’s children (left first).
    /// - [`TraversalAction::Prune`] skips the node’s descendants.
    /// - [`TraversalAction::EarlyExit`] stops the traversal immediately.
    ///
    /// Leaf nodes can be identified with [`BvhNode::leaf_index`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use canopy3d::bounding_volume::Aabb;
    /// use canopy3d::partitioning::{Bvh, BvhBuildStrategy, CullingMask, TraversalAction};
    /// use nalgebra::Point3;
    ///
    /// let mut bvh = Bvh::new();
    /// for i in 0..3 {
    ///     let min = Point3::new(i as f32 * 2.0, 0.0, 0.0);
    ///     let _ = bvh.add(Aabb::new(min, min + nalgebra::Vector3::repeat(1.0)), (), CullingMask::ALL);
    /// }
    /// bvh.build(BvhBuildStrategy::default());
    ///
    /// let mut stats = (0, 0); // (num_internal_nodes, num_leaves)
    /// bvh.traverse(|node| {
    ///     if node.is_leaf() {
    ///         stats.1 += 1;
    ///     } else {
    ///         stats.0 += 1;
    ///     }
    ///     TraversalAction::Continue
    /// });
    ///
    /// assert_eq!(stats, (2, 3));
    /// ```
    pub fn traverse(&self, mut check_node: impl FnMut(&BvhNode) -> TraversalAction) {
        if self.nodes.is_empty() {
            return;
        }

        let mut stack = Self::traversal_stack();
        stack.push(0);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];

            match check_node(node) {
                TraversalAction::Continue => {
                    if let Some([left, right]) = node.children() {
                        stack.push(right);
                        stack.push(left);
                    }
                }
                TraversalAction::Prune => {}
                TraversalAction::EarlyExit => return,
            }
        }
    }

    /// Calls `callback` on every leaf of the tree whose mask shares a bit with `mask`.
    ///
    /// Subtrees whose mask doesn’t share any bit with `mask` are skipped. Leaves are visited in
    /// depth-first order.
    pub fn foreach(&self, mask: CullingMask, mut callback: impl FnMut(u32, &T)) {
        self.traverse(|node| {
            if !node.matches_mask(mask) {
                return TraversalAction::Prune;
            }

            if let Some(leaf_index) = node.leaf_index() {
                let leaf = &self.data[leaf_index as usize];

                if leaf.mask.intersects(mask) {
                    callback(leaf_index, &leaf.data);
                }
            }

            TraversalAction::Continue
        });
    }
}
