//! Ray casting primitives used by the spatial queries.

pub use self::ray::{InvRay, Ray, RayCast};

pub mod ray;
