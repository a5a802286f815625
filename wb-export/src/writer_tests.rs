use std::fs;
use std::path::Path;

use tempfile::tempdir;
use wb_graph::{Activation, LayerSpec, ModelGraph, NetworkKind};

use crate::artifact::{ExportArtifact, ExportError, export};
use crate::writer::{ArtifactMeta, Provenance, blake3_hex, meta_path, write_artifact};

fn layer(in_features: usize, out_features: usize, activation: Activation) -> LayerSpec {
    LayerSpec {
        in_features,
        out_features,
        weight: vec![0.01; in_features * out_features],
        bias: vec![0.0; out_features],
        activation,
    }
}

fn value_graph() -> ModelGraph {
    ModelGraph {
        kind: NetworkKind::Value,
        input_size: 9,
        hidden_size: 16,
        output_size: 1,
        layers: vec![
            layer(9, 16, Activation::Relu),
            layer(16, 1, Activation::Tanh),
        ],
    }
}

fn provenance() -> Provenance {
    Provenance {
        schema_id: "go-json-v1-value".to_string(),
        source_digest: blake3_hex(b"source bytes"),
    }
}

#[test]
fn write_creates_artifact_and_sidecar() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("value.graph.json");

    let artifact = export(&value_graph()).unwrap();
    let meta = write_artifact(&artifact, &target, &provenance()).unwrap();

    let bytes = fs::read(&target).unwrap();
    let back: ExportArtifact = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(back, artifact);

    assert_eq!(meta.format, "mlp-graph");
    assert_eq!(meta.format_version, 1);
    assert_eq!(meta.schema_id, "go-json-v1-value");
    assert_eq!(meta.network_kind, "value");
    assert_eq!(meta.features, vec![9, 16, 1]);
    assert_eq!(meta.source_blake3, blake3_hex(b"source bytes"));
    assert_eq!(meta.artifact_blake3, blake3_hex(&bytes));

    let sidecar = fs::read(meta_path(&target)).unwrap();
    let parsed: ArtifactMeta = serde_json::from_slice(&sidecar).unwrap();
    assert_eq!(parsed, meta);
}

#[test]
fn stale_tmp_file_is_overwritten() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("value.graph.json");
    let stale = dir.path().join("value.graph.json.tmp");
    fs::write(&stale, b"leftover garbage").unwrap();

    let artifact = export(&value_graph()).unwrap();
    write_artifact(&artifact, &target, &provenance()).unwrap();

    assert!(!stale.exists());
    let back: ExportArtifact = serde_json::from_slice(&fs::read(&target).unwrap()).unwrap();
    assert_eq!(back, artifact);
}

#[test]
fn write_into_missing_directory_fails_cleanly() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("missing").join("value.graph.json");

    let artifact = export(&value_graph()).unwrap();
    let err = write_artifact(&artifact, &target, &provenance()).unwrap_err();
    assert!(matches!(err, ExportError::Io(_)));
    assert!(!target.exists());
}

#[test]
fn meta_path_replaces_the_last_extension() {
    assert_eq!(
        meta_path(Path::new("/out/model.graph.json")),
        Path::new("/out/model.graph.meta.json")
    );
}

#[test]
fn repeated_writes_produce_identical_artifact_bytes() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("value.graph.json");

    let artifact = export(&value_graph()).unwrap();
    write_artifact(&artifact, &target, &provenance()).unwrap();
    let first = fs::read(&target).unwrap();
    write_artifact(&artifact, &target, &provenance()).unwrap();
    let second = fs::read(&target).unwrap();
    assert_eq!(first, second);
}

#[test]
fn policy_feature_chain_tracks_affine_widths() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("policy.graph.json");

    let model = ModelGraph {
        kind: NetworkKind::Policy,
        input_size: 9,
        hidden_size: 16,
        output_size: 3,
        layers: vec![
            layer(9, 16, Activation::Relu),
            layer(16, 3, Activation::Softmax),
        ],
    };
    let artifact = export(&model).unwrap();
    let meta = write_artifact(&artifact, &target, &provenance()).unwrap();
    assert_eq!(meta.features, vec![9, 16, 3]);
    assert_eq!(meta.network_kind, "policy");
}
