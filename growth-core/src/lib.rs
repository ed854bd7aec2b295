//! Procedural growth core: space colonization over Poisson-disk leaves.
//!
//! Main components:
//! - [`quadtree`]: point quadtree with circle queries.
//! - [`poisson`]: variable-radius Poisson-disk sampler built on the quadtree.
//! - [`graph`]: the growth graph and its step loop; the step itself lives
//!   in [`phases`], per-tip accumulators in [`influence_buffer`].
//! - [`tree`]: segment arena, traversal and depth stamping.
//! - [`skeleton`]: optional simplification of a grown tree.
//! - [`attractor`]: force-integrated point used as the gravity target.
//! - [`config`]: serde configuration values and TOML presets.
//! - [`field`], [`geometry`], [`types`], [`error`]: shared building blocks.

pub mod attractor;
pub mod config;
pub mod error;
pub mod field;
pub mod geometry;
pub mod graph;
pub mod influence_buffer;
pub mod phases;
pub mod poisson;
pub mod quadtree;
pub mod skeleton;
pub mod tree;
pub mod types;

pub use error::{Error, Result};
pub use graph::{GrowthGraph, GrowthParams};
