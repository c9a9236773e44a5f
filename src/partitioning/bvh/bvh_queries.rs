use super::bvh_traverse::TRAVERSAL_STACK_SIZE;
use super::{Bvh, BvhNode, CullingMask, TraversalAction};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Point, Real};
use crate::query::{InvRay, Ray, RayCast};
use smallvec::SmallVec;

impl<T> Bvh<T> {
    /// Iterates through all the leaves with an AABB intersecting the given `aabb` and a mask
    /// sharing a bit with `mask`.
    pub fn intersect_aabb<'a>(
        &'a self,
        aabb: &'a Aabb,
        mask: CullingMask,
    ) -> impl Iterator<Item = u32> + 'a {
        self.leaves(move |node: &BvhNode| node.matches_mask(mask) && node.intersects_aabb(aabb))
            .filter(move |leaf_index| {
                let leaf = &self.data[*leaf_index as usize];
                leaf.mask.intersects(mask) && leaf.aabb.intersects(aabb)
            })
    }

    /// Calls `on_overlap` on every leaf whose AABB intersects `aabb` and whose mask shares a bit
    /// with `mask`.
    ///
    /// Touching boxes intersect.
    pub fn query_aabb(
        &self,
        aabb: &Aabb,
        mask: CullingMask,
        mut on_overlap: impl FnMut(u32, &T),
    ) {
        self.traverse(|node| {
            if !node.matches_mask(mask) || !node.intersects_aabb(aabb) {
                return TraversalAction::Prune;
            }

            if let Some(leaf_index) = node.leaf_index() {
                let leaf = &self.data[leaf_index as usize];

                if leaf.mask.intersects(mask) && leaf.aabb.intersects(aabb) {
                    on_overlap(leaf_index, &leaf.data);
                }
            }

            TraversalAction::Continue
        });
    }

    /// Calls `on_overlap` on every leaf whose AABB contains `point` and whose mask shares a bit
    /// with `mask`.
    ///
    /// Points on the boundary of an AABB are contained.
    pub fn query_point(
        &self,
        point: &Point<Real>,
        mask: CullingMask,
        mut on_overlap: impl FnMut(u32, &T),
    ) {
        self.traverse(|node| {
            if !node.matches_mask(mask) || !node.contains_point(point) {
                return TraversalAction::Prune;
            }

            if let Some(leaf_index) = node.leaf_index() {
                let leaf = &self.data[leaf_index as usize];

                if leaf.mask.intersects(mask) && leaf.aabb.contains_local_point(point) {
                    on_overlap(leaf_index, &leaf.data);
                }
            }

            TraversalAction::Continue
        });
    }

    /// Calls `on_intersect` on the leaves hit by `ray` before `max_time_of_impact`.
    ///
    /// The closure receives the leaf index, its payload, and the time of impact of the ray with
    /// the leaf’s AABB. At each internal node, the child on the side the ray comes from (along
    /// the node’s split axis) is visited first, so leaves are roughly reported from near to
    /// far. This order isn’t strict: use [`Bvh::cast_ray`] to find the closest hit.
    ///
    /// Returning [`TraversalAction::EarlyExit`] stops the query. Any other value continues it.
    ///
    /// Returns `true` if at least one leaf was reported.
    pub fn query_ray(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
        mask: CullingMask,
        mut on_intersect: impl FnMut(u32, &T, Real) -> TraversalAction,
    ) -> bool {
        let Some(root) = self.nodes.first() else {
            return false;
        };

        let inv_ray = InvRay::from(*ray);

        if !root.matches_mask(mask) || root.cast_inv_ray(&inv_ray, max_time_of_impact).is_none()
        {
            return false;
        }

        let mut stack = Self::traversal_stack();
        let mut found = false;
        stack.push(0);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];

            if let Some(leaf_index) = node.leaf_index() {
                let leaf = &self.data[leaf_index as usize];

                if !leaf.mask.intersects(mask) {
                    continue;
                }

                if let Some(toi) = leaf.aabb.cast_local_inv_ray(&inv_ray, max_time_of_impact) {
                    found = true;

                    if on_intersect(leaf_index, &leaf.data, toi) == TraversalAction::EarlyExit {
                        return true;
                    }
                }

                continue;
            }

            // Push the far child first so the near one is popped first.
            for child in Self::near_far_children(node, &inv_ray).into_iter().rev() {
                let child_node = &self.nodes[child as usize];

                if child_node.matches_mask(mask)
                    && child_node
                        .cast_inv_ray(&inv_ray, max_time_of_impact)
                        .is_some()
                {
                    stack.push(child);
                }
            }
        }

        found
    }

    /// Finds the closest leaf hit by `ray` before `max_time_of_impact`.
    ///
    /// `leaf_cast` computes the actual hit with the geometry the leaf stands for. It receives the
    /// leaf index, its payload, and the time of impact of the closest hit found so far (or
    /// `max_time_of_impact`), and returns the time of impact of its own hit if any. Leaves whose
    /// AABB is farther than the best hit found so far are skipped.
    ///
    /// Returns the index of the closest leaf and its time of impact.
    pub fn cast_ray(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
        mask: CullingMask,
        mut leaf_cast: impl FnMut(u32, &T, Real) -> Option<Real>,
    ) -> Option<(u32, Real)> {
        let root = self.nodes.first()?;
        let inv_ray = InvRay::from(*ray);

        if !root.matches_mask(mask) {
            return None;
        }

        let root_toi = root.cast_inv_ray(&inv_ray, max_time_of_impact)?;
        let mut stack: SmallVec<[(u32, Real); TRAVERSAL_STACK_SIZE]> = SmallVec::new();
        let mut best_toi = max_time_of_impact;
        let mut best_leaf = None;
        stack.push((0, root_toi));

        while let Some((id, entry_toi)) = stack.pop() {
            if entry_toi > best_toi {
                continue;
            }

            let node = &self.nodes[id as usize];

            if let Some(leaf_index) = node.leaf_index() {
                let leaf = &self.data[leaf_index as usize];

                if !leaf.mask.intersects(mask)
                    || leaf.aabb.cast_local_inv_ray(&inv_ray, best_toi).is_none()
                {
                    continue;
                }

                if let Some(toi) = leaf_cast(leaf_index, &leaf.data, best_toi) {
                    if toi <= best_toi {
                        best_toi = toi;
                        best_leaf = Some(leaf_index);
                    }
                }

                continue;
            }

            for child in Self::near_far_children(node, &inv_ray).into_iter().rev() {
                let child_node = &self.nodes[child as usize];

                if !child_node.matches_mask(mask) {
                    continue;
                }

                if let Some(toi) = child_node.cast_inv_ray(&inv_ray, best_toi) {
                    stack.push((child, toi));
                }
            }
        }

        best_leaf.map(|leaf| (leaf, best_toi))
    }

    /// The children of the internal `node`, nearest first along its split axis.
    #[inline]
    fn near_far_children(node: &BvhNode, ray: &InvRay) -> [u32; 2] {
        let first = node.child_offset;

        if ray.is_negative_along(node.axis as usize) {
            [first + 1, first]
        } else {
            [first, first + 1]
        }
    }
}
