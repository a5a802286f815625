//! wb-graph: model reconstruction from checkpoint field maps.

pub mod build;
pub mod model;

pub use build::{BuildError, build};
pub use model::{Activation, ArchParams, LayerSpec, ModelGraph, NetworkKind, PolicyActivation};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
