//! wb-export: portable graph artifacts and atomic artifact writing.

pub mod artifact;
pub mod writer;

pub use artifact::{
    ARTIFACT_FORMAT, ARTIFACT_VERSION, BATCH_DIM, Dim, ExportArtifact, ExportError, GraphOp,
    INPUT_NAME, OUTPUT_NAME, TensorDecl, export,
};
pub use writer::{ArtifactMeta, Provenance, blake3_hex, meta_path, write_artifact};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_nonempty() {
        assert!(!super::VERSION.is_empty());
    }
}

#[cfg(test)]
mod writer_tests;
