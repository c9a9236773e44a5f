use super::{Bvh, BvhBuildStrategy, BvhNode, DEFAULT_REBUILD_TRIGGER};
use crate::math::Real;

impl<T> Bvh<T> {
    /// Updates the node AABBs and masks after leaf changes reported by [`Bvh::update`].
    ///
    /// Only the outdated leaves and their ancestors are recomputed: the topology of the tree
    /// is left unchanged. Every recomputed internal node encloses exactly its two children, and
    /// its mask is the union of their masks.
    ///
    /// The change of the total half surface area of the recomputed internal nodes is added to
    /// [`Bvh::accumulated_refit_delta`]. Refitting a tree without outdated leaves is a no-op.
    pub fn refit(&mut self) {
        let mut outdated = core::mem::take(&mut self.workspace.outdated_leaves);
        let mut refit_nodes = core::mem::take(&mut self.workspace.refit_nodes);
        refit_nodes.clear();

        for &node_id in &outdated {
            let node = &mut self.nodes[node_id as usize];
            let leaf = &self.data[node.child_offset as usize];
            *node = BvhNode::leaf(&leaf.aabb, node.child_offset, leaf.mask);

            // Collect the ancestors. Internal nodes are marked transiently so shared ancestors
            // are only collected once.
            let mut parent = self.parents[node_id as usize];
            while parent != Self::NO_PARENT {
                let parent_node = &mut self.nodes[parent as usize];

                if parent_node.status == BvhNode::OUTDATED {
                    break;
                }

                parent_node.status = BvhNode::OUTDATED;
                refit_nodes.push(parent);
                parent = self.parents[parent as usize];
            }
        }

        // Children are stored after their parent so this processes every node after its
        // descendants.
        refit_nodes.sort_unstable_by(|a, b| b.cmp(a));

        let mut delta = 0.0;

        for &id in &refit_nodes {
            let old_area = self.nodes[id as usize].half_area();
            let new_node = self.merged_children(id);
            let area_change = new_node.half_area() - old_area;

            // Areas of nodes spanning most of the float range overflow.
            if area_change.is_finite() {
                delta += area_change;
            }

            self.nodes[id as usize] = new_node;
        }

        self.accumulated_refit_delta += delta;

        if !outdated.is_empty() {
            log::trace!(
                "Refitted {} leaves and {} internal nodes (delta: {}).",
                outdated.len(),
                refit_nodes.len(),
                delta
            );
        }

        outdated.clear();
        refit_nodes.clear();
        self.workspace.outdated_leaves = outdated;
        self.workspace.refit_nodes = refit_nodes;
    }

    /// The sum of the half surface area changes of internal nodes over all the refits since
    /// the last build.
    ///
    /// Positive values mean that the tree got looser.
    pub fn accumulated_refit_delta(&self) -> Real {
        self.accumulated_refit_delta
    }

    /// The accumulated refit delta relative to the total half surface area of the internal
    /// nodes right after the last build.
    ///
    /// This is 0 for trees without internal nodes. If the reference area is zero (all the
    /// leaves are degenerate and coincident) then any growth is infinitely large.
    pub fn relative_refit_delta(&self) -> Real {
        if self.accumulated_refit_delta == 0.0 {
            0.0
        } else if self.reference_half_area > 0.0 {
            self.accumulated_refit_delta / self.reference_half_area
        } else if self.accumulated_refit_delta > 0.0 {
            Real::INFINITY
        } else {
            0.0
        }
    }

    /// Brings the tree up to date with the leaf storage, rebuilding it only when necessary.
    ///
    /// If leaves were added or removed since the last build, the tree is fully built.
    /// Otherwise it is refitted, and fully rebuilt if the relative refit delta (see
    /// [`Bvh::relative_refit_delta`]) now exceeds `rebuild_trigger`.
    ///
    /// Returns `true` if a full build happened.
    pub fn rebuild(&mut self, strategy: BvhBuildStrategy, rebuild_trigger: Real) -> bool {
        if self.requires_build() {
            self.build(strategy);
            return true;
        }

        self.refit();

        let relative_delta = self.relative_refit_delta();

        if relative_delta > rebuild_trigger {
            log::debug!(
                "Rebuilding BVH with {} leaves: relative refit delta {} exceeds {}.",
                self.data.len(),
                relative_delta,
                rebuild_trigger
            );
            self.build(strategy);
            true
        } else {
            false
        }
    }

    /// Calls [`Bvh::rebuild`] with the default strategy and [`DEFAULT_REBUILD_TRIGGER`].
    pub fn rebuild_with_defaults(&mut self) -> bool {
        self.rebuild(BvhBuildStrategy::default(), DEFAULT_REBUILD_TRIGGER)
    }
}
