use super::{Bvh, BvhNode};
use hashbrown::HashSet;

/// Structural or geometric inconsistency found by [`Bvh::check_well_formed`].
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum BvhValidationError {
    /// The arena doesn’t have `2 * n - 1` nodes for `n` leaves.
    #[error("the tree has {nodes} nodes for {leaves} leaves, expected {expected}.")]
    NodeCountMismatch {
        /// Number of nodes in the arena.
        nodes: usize,
        /// Number of leaves integrated to the tree.
        leaves: usize,
        /// Expected number of nodes.
        expected: usize,
    },
    /// The root has a parent.
    #[error("the root node has the parent {parent}.")]
    RootHasParent {
        /// The parent index stored for the root.
        parent: u32,
    },
    /// An internal node references children outside of the arena.
    #[error("node {node} references the children {child} and {child}+1 outside of the arena.")]
    ChildOutOfBounds {
        /// The internal node.
        node: u32,
        /// Its first child index.
        child: u32,
    },
    /// An internal node references children stored before it.
    #[error("node {node} references the child {child} stored before it.")]
    ChildBeforeParent {
        /// The internal node.
        node: u32,
        /// Its first child index.
        child: u32,
    },
    /// A node was reached twice while traversing the tree.
    #[error("node {node} was reached twice while traversing the tree.")]
    Loop {
        /// The node reached twice.
        node: u32,
    },
    /// Some nodes can’t be reached from the root.
    #[error("only {reached} nodes out of {nodes} are reachable from the root.")]
    UnreachableNodes {
        /// Number of nodes reached from the root.
        reached: usize,
        /// Number of nodes in the arena.
        nodes: usize,
    },
    /// A node’s stored parent doesn’t match the actual one.
    #[error("node {node} has the parent {found} instead of {expected}.")]
    ParentMismatch {
        /// The child node.
        node: u32,
        /// The node referencing it as a child.
        expected: u32,
        /// The parent index stored for it.
        found: u32,
    },
    /// An internal node has an invalid split axis.
    #[error("internal node {node} has the invalid split axis {axis}.")]
    InvalidAxis {
        /// The internal node.
        node: u32,
        /// Its split axis.
        axis: i8,
    },
    /// A leaf node references a leaf that doesn’t exist.
    #[error("leaf node {node} references the leaf {leaf} outside of the leaf storage.")]
    LeafOutOfBounds {
        /// The leaf node.
        node: u32,
        /// The leaf index it references.
        leaf: u32,
    },
    /// The node registered for a leaf isn’t the node referencing it.
    #[error("leaf {leaf} is registered at node {found} instead of {expected}.")]
    LeafNodeMismatch {
        /// The leaf index.
        leaf: u32,
        /// The node referencing the leaf.
        expected: u32,
        /// The node registered for the leaf.
        found: u32,
    },
    /// A leaf node changed since the last refit.
    #[error("leaf node {node} is outdated.")]
    OutdatedLeaf {
        /// The leaf node.
        node: u32,
    },
    /// A node doesn’t enclose its children, or a leaf node doesn’t enclose its leaf AABB.
    #[error("node {node} doesn’t enclose the bounds of {child}.")]
    LooseBounds {
        /// The enclosing node.
        node: u32,
        /// The enclosed node for internal nodes, or the leaf index for leaf nodes.
        child: u32,
    },
    /// A node mask isn’t the union of its children masks, or the mask of its leaf.
    #[error("node {node} has the mask {found:#06x} instead of {expected:#06x}.")]
    MaskMismatch {
        /// The node.
        node: u32,
        /// The expected mask bits.
        expected: u16,
        /// The actual mask bits.
        found: u16,
    },
}

impl<T> Bvh<T> {
    /// Checks that the tree is well-formed.
    ///
    /// The tree is well-formed if it is topologically correct (the arena is a complete binary
    /// tree linking every integrated leaf exactly once, with consistent parent links) and
    /// geometrically correct (every node encloses its children, node masks are the union of
    /// their children masks, and no leaf is waiting for a refit).
    ///
    /// An empty arena is well-formed.
    pub fn check_well_formed(&self) -> Result<(), BvhValidationError> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let leaves = self.leaf_nodes.len();
        let expected = (2 * leaves).saturating_sub(1);

        if self.nodes.len() != expected || self.parents.len() != expected {
            return Err(BvhValidationError::NodeCountMismatch {
                nodes: self.nodes.len(),
                leaves,
                expected,
            });
        }

        if self.parents[0] != Self::NO_PARENT {
            return Err(BvhValidationError::RootHasParent {
                parent: self.parents[0],
            });
        }

        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut stack = alloc::vec![0u32];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(BvhValidationError::Loop { node: id });
            }

            let node = &self.nodes[id as usize];

            match node.children() {
                None => self.check_leaf_node(id, node)?,
                Some([left, right]) => {
                    self.check_internal_node(id, node)?;
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        if visited.len() != self.nodes.len() {
            return Err(BvhValidationError::UnreachableNodes {
                reached: visited.len(),
                nodes: self.nodes.len(),
            });
        }

        Ok(())
    }

    /// Panics if the tree isn’t well-formed.
    ///
    /// See [`Bvh::check_well_formed`] for details.
    pub fn assert_well_formed(&self) {
        if let Err(err) = self.check_well_formed() {
            panic!("malformed BVH: {err}");
        }
    }

    fn check_leaf_node(&self, id: u32, node: &BvhNode) -> Result<(), BvhValidationError> {
        let leaf_index = node.child_offset;
        let Some(leaf) = self.data.get(leaf_index as usize) else {
            return Err(BvhValidationError::LeafOutOfBounds {
                node: id,
                leaf: leaf_index,
            });
        };
        let registered = self
            .leaf_nodes
            .get(leaf_index as usize)
            .copied()
            .unwrap_or(u32::MAX);

        if registered != id {
            return Err(BvhValidationError::LeafNodeMismatch {
                leaf: leaf_index,
                expected: id,
                found: registered,
            });
        }

        if node.is_outdated() {
            return Err(BvhValidationError::OutdatedLeaf { node: id });
        }

        if !node.contains_aabb(&leaf.aabb) {
            return Err(BvhValidationError::LooseBounds {
                node: id,
                child: leaf_index,
            });
        }

        if node.mask != leaf.mask {
            return Err(BvhValidationError::MaskMismatch {
                node: id,
                expected: leaf.mask.bits(),
                found: node.mask.bits(),
            });
        }

        Ok(())
    }

    fn check_internal_node(&self, id: u32, node: &BvhNode) -> Result<(), BvhValidationError> {
        let first = node.child_offset;

        if !(0..3).contains(&node.axis) {
            return Err(BvhValidationError::InvalidAxis {
                node: id,
                axis: node.axis,
            });
        }

        if first <= id {
            return Err(BvhValidationError::ChildBeforeParent {
                node: id,
                child: first,
            });
        }

        if first as usize + 1 >= self.nodes.len() {
            return Err(BvhValidationError::ChildOutOfBounds {
                node: id,
                child: first,
            });
        }

        let mut mask = super::CullingMask::empty();

        for child in [first, first + 1] {
            let parent = self.parents[child as usize];

            if parent != id {
                return Err(BvhValidationError::ParentMismatch {
                    node: child,
                    expected: id,
                    found: parent,
                });
            }

            let child_node = &self.nodes[child as usize];

            if !node.contains(child_node) {
                return Err(BvhValidationError::LooseBounds { node: id, child });
            }

            mask |= child_node.mask;
        }

        if node.mask != mask {
            return Err(BvhValidationError::MaskMismatch {
                node: id,
                expected: mask.bits(),
                found: node.mask.bits(),
            });
        }

        Ok(())
    }
}
