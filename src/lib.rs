/*!
canopy3d
========

**canopy3d** is a 3-dimensional bounding volume hierarchy written with the rust
programming language. It indexes axis-aligned bounding boxes of arbitrary payloads and
answers point, ray, box and tree-vs-tree queries filtered by a 16-bit culling mask.

*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)] // This usually makes it way more verbose that it could be.
#![allow(clippy::type_complexity)] // Complains about closures that are fairly simple.
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unused_qualifications)]

extern crate alloc;

pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod partitioning;
pub mod query;

mod real {
    /// The scalar type used throughout this crate.
    ///
    /// Fixed to `f32` so that [`BvhNode`](crate::partitioning::BvhNode) keeps its 32-bytes layout.
    pub use f32 as Real;
}

/// Aliases for mathematical types.
pub mod math {
    pub use super::real::*;
    pub use na::{Point3, Vector3};

    /// The default tolerance used for geometric operations.
    pub const DEFAULT_EPSILON: Real = Real::EPSILON;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub use Point3 as Point;

    /// The vector type.
    pub use Vector3 as Vector;
}
