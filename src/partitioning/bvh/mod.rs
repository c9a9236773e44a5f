pub use bvh_traverse::{Leaves, TraversalAction};
pub use bvh_tree::{
    Bvh, BvhBuildStrategy, BvhLeaf, BvhNode, CullingMask, DEFAULT_REBUILD_TRIGGER,
};
pub use bvh_validation::BvhValidationError;

mod bvh_binned_build;
mod bvh_build;
mod bvh_queries;
mod bvh_refit;
mod bvh_traverse;
mod bvh_traverse_bvtt;
mod bvh_tree;
mod bvh_update;
mod bvh_validation;
