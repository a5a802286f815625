//! Atomic artifact + provenance sidecar writing.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::artifact::{ARTIFACT_FORMAT, ARTIFACT_VERSION, ExportArtifact, ExportError, GraphOp};

/// Caller-supplied provenance fields.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub schema_id: String,
    /// blake3 hex of the source container bytes.
    pub source_digest: String,
}

/// Provenance sidecar written next to every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub format: String,
    pub format_version: u32,
    pub tool_version: String,
    pub schema_id: String,
    pub network_kind: String,
    /// Feature widths through the network, input first (e.g. `[9, 16, 1]`).
    pub features: Vec<usize>,
    pub source_blake3: String,
    pub artifact_blake3: String,
    pub created_ts_ms: u64,
}

pub fn blake3_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Sidecar path for `target` (`model.graph.json` → `model.graph.meta.json`).
pub fn meta_path(target: &Path) -> PathBuf {
    target.with_extension("meta.json")
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn feature_chain(artifact: &ExportArtifact) -> Vec<usize> {
    let mut chain = Vec::new();
    for op in &artifact.ops {
        if let GraphOp::Affine {
            in_features,
            out_features,
            ..
        } = op
        {
            if chain.is_empty() {
                chain.push(*in_features);
            }
            chain.push(*out_features);
        }
    }
    chain
}

/// Serialize `artifact` to `target`, then write its provenance sidecar.
///
/// Both files go through a temp path + `rename`, so a failure never leaves a
/// partial file at either final location. The artifact lands before the
/// sidecar; a stale `.tmp` from a crashed run is overwritten harmlessly.
pub fn write_artifact(
    artifact: &ExportArtifact,
    target: &Path,
    prov: &Provenance,
) -> Result<ArtifactMeta, ExportError> {
    let bytes = artifact.to_json_bytes()?;

    let tmp = tmp_path(target);
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, target)?;

    let meta = ArtifactMeta {
        format: ARTIFACT_FORMAT.to_string(),
        format_version: ARTIFACT_VERSION,
        tool_version: crate::VERSION.to_string(),
        schema_id: prov.schema_id.clone(),
        network_kind: artifact.kind.clone(),
        features: feature_chain(artifact),
        source_blake3: prov.source_digest.clone(),
        artifact_blake3: blake3_hex(&bytes),
        created_ts_ms: now_ms(),
    };
    let meta_final = meta_path(target);
    let meta_tmp = tmp_path(&meta_final);
    fs::write(&meta_tmp, serde_json::to_vec_pretty(&meta)?)?;
    fs::rename(&meta_tmp, &meta_final)?;

    Ok(meta)
}
