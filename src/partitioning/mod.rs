//! Spatial partitioning tools.

pub use self::bvh::{
    Bvh, BvhBuildStrategy, BvhLeaf, BvhNode, BvhValidationError, CullingMask, Leaves,
    TraversalAction, DEFAULT_REBUILD_TRIGGER,
};

/// A Bounding Volume Hierarchy over AABBs with culling masks.
pub mod bvh;
