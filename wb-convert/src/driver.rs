//! End-to-end conversion driver.
//!
//! One call takes source container bytes to a written artifact. Stages run
//! in a fixed order and the first failure aborts the whole conversion, so
//! the target location never sees a partial result.

use std::path::{Path, PathBuf};

use thiserror::Error;

use wb_checkpoint::{ReadError, SchemaError, read, resolve};
use wb_export::{ArtifactMeta, ExportError, Provenance, blake3_hex, export, write_artifact};
use wb_graph::{Activation, ArchParams, BuildError, NetworkKind, PolicyActivation, build};

/// Everything one conversion needs.
#[derive(Debug, Clone)]
pub struct ConvertRequest<'a> {
    pub schema_id: &'a str,
    pub source: &'a [u8],
    pub arch: ArchParams,
    pub kind: NetworkKind,
    pub policy_activation: Option<PolicyActivation>,
    pub target: &'a Path,
}

/// The pipeline's first failure, labeled with the stage it came from. The
/// underlying error is reported verbatim.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("params: {0}")]
    Params(BuildError),
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("read: {0}")]
    Read(#[from] ReadError),
    #[error("build: {0}")]
    Build(BuildError),
    #[error("export: {0}")]
    Export(ExportError),
    #[error("write: {0}")]
    Write(ExportError),
}

/// One layer of the converted model, for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSummary {
    pub in_features: usize,
    pub out_features: usize,
    pub activation: Activation,
}

/// Successful conversion outcome.
#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub target: PathBuf,
    pub meta: ArtifactMeta,
    pub layers: Vec<LayerSummary>,
}

/// Run one conversion end to end.
///
/// Stage order: parameter validation, schema resolution, container read,
/// model build, graph export with its forward dry-run, atomic write.
/// Parameters are checked before any container bytes are read, so a policy
/// request missing its output size fails even on an unreadable source.
pub fn convert(req: &ConvertRequest<'_>) -> Result<ConvertReport, ConvertError> {
    req.arch
        .validate(req.kind, req.policy_activation)
        .map_err(ConvertError::Params)?;

    let descriptor = resolve(req.schema_id)?;
    let fields = read(req.source, descriptor)?;
    let model = build(descriptor, fields, &req.arch, req.kind, req.policy_activation)
        .map_err(ConvertError::Build)?;

    let layers = model
        .layers
        .iter()
        .map(|l| LayerSummary {
            in_features: l.in_features,
            out_features: l.out_features,
            activation: l.activation,
        })
        .collect();

    let artifact = export(&model).map_err(ConvertError::Export)?;
    let prov = Provenance {
        schema_id: req.schema_id.to_string(),
        source_digest: blake3_hex(req.source),
    };
    let meta = write_artifact(&artifact, req.target, &prov).map_err(ConvertError::Write)?;

    Ok(ConvertReport {
        target: req.target.to_path_buf(),
        meta,
        layers,
    })
}
