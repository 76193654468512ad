//! Spatial support treated as an opaque value layer over the `geo` crate.
//!
//! - **BoundingBox**: possibly-empty rectangular extent used as a pre-filter
//! - **GeometryFactory**: coordinate system id plus precision grid
//! - **GeometryFactoryCache**: explicit, shareable cache of factories

pub mod bounding_box;
pub mod factory;

pub use bounding_box::BoundingBox;
pub use factory::{GeometryFactory, GeometryFactoryCache};
