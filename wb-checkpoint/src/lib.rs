//! wb-checkpoint: versioned source schemas + container reading.

pub mod reader;
pub mod schema;

pub use reader::{FieldMap, ReadError, TensorField, read};
pub use schema::{
    LayerFields, SchemaDescriptor, SchemaError, SourceKind, resolve, schemas,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
