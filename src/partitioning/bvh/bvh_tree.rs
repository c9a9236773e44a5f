use crate::bounding_volume::Aabb;
use crate::math::{Point, Real, Vector, DIM};
use crate::query::{InvRay, RayCast};
use alloc::vec::Vec;

/// Relative refit delta above which [`Bvh::rebuild`] performs a full build.
///
/// See [`Bvh::relative_refit_delta`] for the definition of the measured quantity.
pub const DEFAULT_REBUILD_TRIGGER: Real = 0.01;

/// The strategy for one-time build of the tree.
///
/// All strategies produce a valid tree: they only affect the time spent building it and the
/// performances of the queries afterward. For ray-heavy workloads,
/// [`BvhBuildStrategy::SurfaceAreaHeuristic`] is recommended. For trees rebuilt every frame,
/// [`BvhBuildStrategy::EqualCount`] is the fastest to build.
#[derive(Default, Clone, Debug, Copy, PartialEq, Eq, Hash)]
pub enum BvhBuildStrategy {
    /// Splits the leaves at the median of their centers, along the axis where the centers are
    /// the most spread out.
    ///
    /// This gives a perfectly balanced tree regardless of the spatial distribution of the
    /// leaves.
    EqualCount,
    /// Splits the leaves at the spatial middle of the node's AABB, along its longest axis.
    ///
    /// Subtrees may be unbalanced but split planes are geometrically meaningful.
    Middle,
    /// Splits the leaves where the accumulated surface area of the leaves on both sides
    /// balances out.
    ///
    /// This is a cheap approximation of a cost-based split that doesn't evaluate discrete
    /// candidate planes.
    #[default]
    AreaWeighted,
    /// Splits the leaves along the plane minimizing the Surface Area Heuristic cost.
    ///
    /// Candidate planes are the boundaries of bins spread over the range of the leaf centers,
    /// on each axis. This is the slowest to build but gives the best ray-casting performances.
    SurfaceAreaHeuristic,
}

/// A 16-bits mask used to select the leaves taken into account by a query.
///
/// A leaf is reported by a query only if its mask shares at least one bit with the query
/// mask. The mask of an internal node is the union of the masks of all its descendant leaves,
/// so whole subtrees can be skipped at once.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
#[repr(transparent)]
pub struct CullingMask(u16);

bitflags::bitflags! {
    impl CullingMask: u16 {
        /// The group 1.
        const GROUP_1 = 1 << 0;
        /// The group 2.
        const GROUP_2 = 1 << 1;
        /// The group 3.
        const GROUP_3 = 1 << 2;
        /// The group 4.
        const GROUP_4 = 1 << 3;
        /// The group 5.
        const GROUP_5 = 1 << 4;
        /// The group 6.
        const GROUP_6 = 1 << 5;
        /// The group 7.
        const GROUP_7 = 1 << 6;
        /// The group 8.
        const GROUP_8 = 1 << 7;
        /// The group 9.
        const GROUP_9 = 1 << 8;
        /// The group 10.
        const GROUP_10 = 1 << 9;
        /// The group 11.
        const GROUP_11 = 1 << 10;
        /// The group 12.
        const GROUP_12 = 1 << 11;
        /// The group 13.
        const GROUP_13 = 1 << 12;
        /// The group 14.
        const GROUP_14 = 1 << 13;
        /// The group 15.
        const GROUP_15 = 1 << 14;
        /// The group 16.
        const GROUP_16 = 1 << 15;
        /// All of the groups.
        const ALL = u16::MAX;
    }
}

impl Default for CullingMask {
    /// Leaves belong to every group by default.
    fn default() -> Self {
        Self::ALL
    }
}

impl From<u16> for CullingMask {
    fn from(bits: u16) -> Self {
        Self::from_bits_retain(bits)
    }
}

/// The node (internal or leaf) of a BVH.
///
/// Nodes are stored contiguously in the BVH arena. This layout is exactly 32 bytes and is
/// part of the public contract of this crate: it can be uploaded as-is to a GPU buffer (see
/// [`Bvh::nodes_as_bytes`] with the `bytemuck-serialize` feature).
///
/// The node's AABB is stored as a center and half-extents. It is conservative: the decoded
/// box `[center - radius, center + radius]` always encloses the exact box it was built from.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
#[repr(C)]
pub struct BvhNode {
    /// Center of this node’s AABB.
    pub(super) center: Point<Real>,
    /// Half-extents of this node’s AABB.
    pub(super) radius: Vector<Real>,
    /// For internal nodes, the arena index of the first child. The second child is always
    /// stored right after it. For leaves, the index of the leaf in the BVH leaf storage.
    pub(super) child_offset: u32,
    /// The split axis of an internal node, or [`BvhNode::LEAF_AXIS`] for leaves.
    pub(super) axis: i8,
    /// Leaf status: [`BvhNode::UP_TO_DATE`] or [`BvhNode::OUTDATED`].
    pub(super) status: u8,
    /// The leaf mask, or the union of all the descendant leaf masks for internal nodes.
    pub(super) mask: CullingMask,
}

static_assertions::assert_eq_size!(BvhNode, [u8; 32]);

impl BvhNode {
    /// The value of [`BvhNode::axis`] for leaf nodes.
    pub const LEAF_AXIS: i8 = -1;
    /// The node's bounds are consistent with the leaf storage.
    pub const UP_TO_DATE: u8 = 0;
    /// The leaf changed since the last refit.
    pub const OUTDATED: u8 = 1;

    #[inline(always)]
    pub(super) fn zeros() -> Self {
        Self {
            center: Point::origin(),
            radius: Vector::zeros(),
            child_offset: 0,
            axis: Self::LEAF_AXIS,
            status: Self::UP_TO_DATE,
            mask: CullingMask::empty(),
        }
    }

    /// Initializes a leaf node bounding `aabb`.
    #[inline]
    pub fn leaf(aabb: &Aabb, leaf_index: u32, mask: CullingMask) -> Self {
        let (center, radius) = conservative_center_radius(aabb);
        Self {
            center,
            radius,
            child_offset: leaf_index,
            axis: Self::LEAF_AXIS,
            status: Self::UP_TO_DATE,
            mask,
        }
    }

    /// Initializes an internal node bounding `aabb`, with children at `first_child` and
    /// `first_child + 1`.
    #[inline]
    pub(super) fn internal(aabb: &Aabb, first_child: u32, axis: i8, mask: CullingMask) -> Self {
        let (center, radius) = conservative_center_radius(aabb);
        Self {
            center,
            radius,
            child_offset: first_child,
            axis,
            status: Self::UP_TO_DATE,
            mask,
        }
    }

    /// Is this node a leaf?
    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.axis < 0
    }

    /// If this node is a leaf, returns the index of its leaf in the BVH leaf storage.
    #[inline(always)]
    pub fn leaf_index(&self) -> Option<u32> {
        self.is_leaf().then_some(self.child_offset)
    }

    /// If this node is internal, the arena indices of its two children.
    #[inline(always)]
    pub fn children(&self) -> Option<[u32; 2]> {
        (!self.is_leaf()).then_some([self.child_offset, self.child_offset + 1])
    }

    /// The split axis this internal node was created with.
    #[inline]
    pub fn split_axis(&self) -> Option<usize> {
        (!self.is_leaf()).then_some(self.axis as usize)
    }

    /// The raw `child_offset` field (first child index, or leaf index).
    #[inline]
    pub fn child_offset(&self) -> u32 {
        self.child_offset
    }

    /// Was this leaf changed since the last refit?
    #[inline(always)]
    pub fn is_outdated(&self) -> bool {
        self.status == Self::OUTDATED
    }

    /// The culling mask of this node.
    #[inline(always)]
    pub fn mask(&self) -> CullingMask {
        self.mask
    }

    /// Does this node’s mask share at least one bit with `mask`?
    #[inline(always)]
    pub fn matches_mask(&self, mask: CullingMask) -> bool {
        self.mask.intersects(mask)
    }

    /// The center of this node’s AABB.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        self.center
    }

    /// The half-extents of this node’s AABB.
    #[inline]
    pub fn radius(&self) -> Vector<Real> {
        self.radius
    }

    /// The min corner of this node’s AABB.
    #[inline]
    pub fn mins(&self) -> Point<Real> {
        self.center - self.radius
    }

    /// The max corner of this node’s AABB.
    #[inline]
    pub fn maxs(&self) -> Point<Real> {
        self.center + self.radius
    }

    /// This node’s AABB.
    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.mins(), self.maxs())
    }

    /// The half surface area of this node’s AABB.
    #[inline]
    pub fn half_area(&self) -> Real {
        let extents = self.radius * 2.0;
        extents.x * (extents.y + extents.z) + extents.y * extents.z
    }

    /// Checks if the AABB of `self` intersects the `other` node’s AABB.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        na::partial_le(&self.mins(), &other.maxs()) && na::partial_ge(&self.maxs(), &other.mins())
    }

    /// Checks if the AABB of `self` intersects `aabb`.
    #[inline]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        na::partial_le(&self.mins(), &aabb.maxs) && na::partial_ge(&self.maxs(), &aabb.mins)
    }

    /// Checks if the AABB of `self` fully encloses the `other` node’s AABB.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        na::partial_le(&self.mins(), &other.mins()) && na::partial_ge(&self.maxs(), &other.maxs())
    }

    /// Checks if the AABB of `self` fully encloses `aabb`.
    #[inline]
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        na::partial_le(&self.mins(), &aabb.mins) && na::partial_ge(&self.maxs(), &aabb.maxs)
    }

    /// Checks if the AABB of `self` contains `point`.
    #[inline]
    pub fn contains_point(&self, point: &Point<Real>) -> bool {
        (point - self.center).abs() <= self.radius
    }

    /// Casts a ray on this node’s AABB.
    ///
    /// Returns the entry time of impact, or `None` if there is no hit before
    /// `max_time_of_impact`.
    #[inline]
    pub fn cast_inv_ray(&self, ray: &InvRay, max_time_of_impact: Real) -> Option<Real> {
        self.aabb().cast_local_inv_ray(ray, max_time_of_impact)
    }
}

/// Encodes `aabb` as a center and half-extents.
///
/// The half-extents are padded by a few ulps of the magnitudes involved, so that
/// `center ± radius` never rounds to a box smaller than `aabb`. The center is always finite:
/// bounds beyond `±Real::MAX` are clamped before computing it, and the matching half-extents
/// become infinite.
fn conservative_center_radius(aabb: &Aabb) -> (Point<Real>, Vector<Real>) {
    let clamped = Aabb::new(
        aabb.mins.sup(&Point::from(Vector::repeat(-Real::MAX))),
        aabb.maxs.inf(&Point::from(Vector::repeat(Real::MAX))),
    );
    let center = clamped.center();
    let mut radius = (clamped.maxs - center).sup(&(center - clamped.mins));
    let padding = (center.coords.abs() + radius) * (4.0 * Real::EPSILON);
    radius += padding;

    for i in 0..DIM {
        if !aabb.mins[i].is_finite() || !aabb.maxs[i].is_finite() {
            radius[i] = Real::INFINITY;
        }
    }

    (center, radius)
}

/// A leaf stored by a BVH: a bounding box, its payload, and its culling mask.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BvhLeaf<T> {
    /// The bounding box of the leaf.
    pub aabb: Aabb,
    /// The payload associated to the leaf.
    pub data: T,
    /// The culling mask of the leaf.
    pub mask: CullingMask,
}

impl<T> BvhLeaf<T> {
    /// Creates a leaf.
    pub fn new(aabb: Aabb, data: T, mask: CullingMask) -> Self {
        Self { aabb, data, mask }
    }
}

/// A leaf as seen by the tree builders.
#[derive(Copy, Clone, Debug)]
pub(super) struct BvhBuildItem {
    pub aabb: Aabb,
    pub center: Point<Real>,
    pub leaf: u32,
}

/// A range of build items waiting to be emitted at the arena index `node`.
#[derive(Copy, Clone, Debug)]
pub(super) struct BvhBuildTask {
    pub node: u32,
    pub start: usize,
    pub end: usize,
}

/// Workspace data for the tree maintenance operations.
///
/// This is all temporary data that can be freed at any time without affecting results.
/// It is kept alive by the tree to lower the cost of internal allocations of repeated
/// builds and refits.
#[derive(Clone, Debug, Default)]
pub(super) struct BvhWorkspace {
    /// Arena indices of the leaf nodes marked as outdated since the last refit.
    pub outdated_leaves: Vec<u32>,
    /// Internal nodes to recompute during a refit.
    pub refit_nodes: Vec<u32>,
    pub build_items: Vec<BvhBuildItem>,
    pub build_tasks: Vec<BvhBuildTask>,
}

/// A Bounding Volume Hierarchy over AABBs associated to payloads of type `T`.
///
/// The tree owns both its leaves (the AABB, payload and mask given to [`Bvh::add`]) and its
/// nodes, stored in a flat arena where every child relation is an index. The root is at
/// index 0 and the two children of an internal node are always stored next to each other.
///
/// # Lifecycle
///
/// 1. Add leaves with [`Bvh::add`].
/// 2. Build the tree with [`Bvh::build`]. Queries see nothing until then.
/// 3. Mutate leaves with [`Bvh::update`], then repair the tree with [`Bvh::refit`] or
///    [`Bvh::rebuild`].
///
/// Leaves added after a build are stored but invisible to queries until the next
/// [`Bvh::build`] or [`Bvh::rebuild`].
///
/// # Example
///
/// ```rust
/// use canopy3d::bounding_volume::Aabb;
/// use canopy3d::partitioning::{Bvh, BvhBuildStrategy, CullingMask};
/// use nalgebra::Point3;
///
/// let mut bvh = Bvh::new();
/// for i in 0..3 {
///     let min = Point3::new(i as f32 * 5.0, 0.0, 0.0);
///     let aabb = Aabb::new(min, min + nalgebra::Vector3::repeat(1.0));
///     let _ = bvh.add(aabb, i, CullingMask::ALL);
/// }
/// bvh.build(BvhBuildStrategy::EqualCount);
///
/// let mut found = vec![];
/// bvh.query_point(&Point3::new(5.5, 0.5, 0.5), CullingMask::ALL, |leaf, data| {
///     found.push((leaf, *data))
/// });
/// assert_eq!(found, vec![(1, 1)]);
/// ```
#[derive(Clone, Debug)]
pub struct Bvh<T> {
    pub(super) data: Vec<BvhLeaf<T>>,
    pub(super) nodes: Vec<BvhNode>,
    // Parent indices for elements in `nodes`. Only needed for bottom-up refits.
    pub(super) parents: Vec<u32>,
    // Arena index of the node of each leaf integrated in the tree. Leaves added after the
    // last build have no entry.
    pub(super) leaf_nodes: Vec<u32>,
    pub(super) accumulated_refit_delta: Real,
    pub(super) reference_half_area: Real,
    pub(super) workspace: BvhWorkspace,
}

impl<T> Default for Bvh<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            nodes: Vec::new(),
            parents: Vec::new(),
            leaf_nodes: Vec::new(),
            accumulated_refit_delta: 0.0,
            reference_half_area: 0.0,
            workspace: BvhWorkspace::default(),
        }
    }
}

impl<T> Bvh<T> {
    /// Parent index of the root node.
    pub(super) const NO_PARENT: u32 = u32::MAX;

    /// An empty BVH.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of leaves stored by this BVH, including the ones not integrated to the tree
    /// yet.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Does this BVH not store any leaf?
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The leaf with the given index.
    ///
    /// Panics if `leaf_index` is out of bounds.
    pub fn leaf(&self, leaf_index: u32) -> &BvhLeaf<T> {
        &self.data[leaf_index as usize]
    }

    /// All the leaves stored by this BVH, indexed by their leaf index.
    pub fn leaves_data(&self) -> &[BvhLeaf<T>] {
        &self.data
    }

    /// The node arena of this BVH. The root is at index 0.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// The raw bytes of the node arena, 32 bytes per node.
    #[cfg(feature = "bytemuck")]
    pub fn nodes_as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// The number of nodes in the arena.
    ///
    /// This is `2 * n - 1` after building a tree with `n` leaves.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Reference to the leaf node associated to the given leaf index.
    ///
    /// Returns `None` if the leaf isn’t integrated into the tree.
    pub fn leaf_node(&self, leaf_index: u32) -> Option<&BvhNode> {
        let id = self.leaf_nodes.get(leaf_index as usize)?;
        self.nodes.get(*id as usize)
    }

    /// Does this tree need a full [`Bvh::build`] before every leaf becomes visible to queries?
    ///
    /// This is the case after adding leaves to a built tree, or after removing leaves.
    pub fn requires_build(&self) -> bool {
        self.leaf_nodes.len() != self.data.len()
    }

    /// The AABB bounding everything contained by this tree.
    ///
    /// Returns an invalid AABB if the tree is empty.
    pub fn root_aabb(&self) -> Aabb {
        self.nodes
            .first()
            .map(|root| root.aabb())
            .unwrap_or_else(Aabb::new_invalid)
    }

    /// The depth of the sub-tree rooted at the node with index `node_id`.
    ///
    /// Set `node_id` to 0 to get the depth of the whole tree.
    ///
    /// Panics if the tree isn’t empty and `node_id` is out of bounds.
    pub fn subtree_depth(&self, node_id: u32) -> u32 {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut depth = 0;
        let mut stack = alloc::vec![(node_id, 1)];

        while let Some((id, node_depth)) = stack.pop() {
            depth = depth.max(node_depth);

            if let Some([left, right]) = self.nodes[id as usize].children() {
                stack.push((left, node_depth + 1));
                stack.push((right, node_depth + 1));
            }
        }

        depth
    }

    /// An approximation of the memory usage (in bytes) for this struct plus
    /// the memory it allocates dynamically.
    pub fn total_memory_size(&self) -> usize {
        size_of::<Self>() + self.heap_memory_size()
    }

    /// An approximation of the memory dynamically-allocated by this struct.
    pub fn heap_memory_size(&self) -> usize {
        let Self {
            data,
            nodes,
            parents,
            leaf_nodes,
            accumulated_refit_delta: _,
            reference_half_area: _,
            workspace,
        } = self;
        data.capacity() * size_of::<BvhLeaf<T>>()
            + nodes.capacity() * size_of::<BvhNode>()
            + parents.capacity() * size_of::<u32>()
            + leaf_nodes.capacity() * size_of::<u32>()
            + workspace.outdated_leaves.capacity() * size_of::<u32>()
            + workspace.refit_nodes.capacity() * size_of::<u32>()
            + workspace.build_items.capacity() * size_of::<BvhBuildItem>()
            + workspace.build_tasks.capacity() * size_of::<BvhBuildTask>()
    }

    /// Recomputes the internal node `id` from its two children.
    ///
    /// The result is marked as up to date.
    #[inline]
    pub(super) fn merged_children(&self, id: u32) -> BvhNode {
        use crate::bounding_volume::BoundingVolume;

        let node = &self.nodes[id as usize];
        let first = node.child_offset as usize;
        let left = &self.nodes[first];
        let right = &self.nodes[first + 1];
        BvhNode::internal(
            &left.aabb().merged(&right.aabb()),
            node.child_offset,
            node.axis,
            left.mask | right.mask,
        )
    }

    /// The sum of the half surface areas of all the internal nodes.
    pub(super) fn internal_half_area(&self) -> Real {
        self.nodes
            .iter()
            .filter(|node| !node.is_leaf())
            .map(|node| node.half_area())
            .sum()
    }
}
