use std::fs;
use std::process::Command;

use serde_json::{Value, json};

fn weightbridge_bin() -> String {
    // Provided by Cargo for integration tests of binaries.
    env!("CARGO_BIN_EXE_weightbridge").to_string()
}

fn matrix(rows: usize, cols: usize) -> Value {
    let m: Vec<Vec<f64>> = (0..rows)
        .map(|r| (0..cols).map(|c| (r * cols + c) as f64 * 0.01).collect())
        .collect();
    json!(m)
}

fn vector(n: usize) -> Value {
    let v: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
    json!(v)
}

fn value_dump(input: usize, hidden: usize) -> Vec<u8> {
    let dump = json!({
        "inputSize": input,
        "hiddenSize": hidden,
        "weightsInputHidden": matrix(hidden, input),
        "biasesHidden": vector(hidden),
        "weightsHiddenOutput": matrix(1, hidden),
        "biasOutput": 0.5,
    });
    serde_json::to_vec(&dump).unwrap()
}

fn policy_dump_v2(input: usize, hidden: usize, output: usize) -> Vec<u8> {
    let dump = json!({
        "inputSize": input,
        "hiddenSize": hidden,
        "outputSize": output,
        "weightsInputHiddenPolicy": matrix(hidden, input),
        "biasesHiddenPolicy": vector(hidden),
        "weightsHiddenOutputPolicy": matrix(output, hidden),
        "biasesOutputPolicy": vector(output),
    });
    serde_json::to_vec(&dump).unwrap()
}

#[test]
fn convert_value_dump_writes_artifact_and_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("value.json");
    let target = dir.path().join("value.graph.json");
    fs::write(&source, value_dump(9, 16)).unwrap();

    let out = Command::new(weightbridge_bin())
        .args([
            "convert",
            "--schema",
            "go-json-v1-value",
            "--in",
            source.to_str().unwrap(),
            "--out",
            target.to_str().unwrap(),
            "--kind",
            "value",
            "--input-size",
            "9",
            "--hidden-size",
            "16",
        ])
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Architecture (value):"));
    assert!(stdout.contains("9 -> 16, relu"));
    assert!(stdout.contains("16 -> 1, tanh"));

    let doc: Value = serde_json::from_slice(&fs::read(&target).unwrap()).unwrap();
    assert_eq!(doc["format"], "mlp-graph");
    assert_eq!(doc["ops"][1]["op"], "relu");
    assert_eq!(doc["ops"][3]["op"], "tanh");

    let sidecar = dir.path().join("value.graph.meta.json");
    let meta: Value = serde_json::from_slice(&fs::read(&sidecar).unwrap()).unwrap();
    assert_eq!(meta["schema_id"], "go-json-v1-value");
    assert_eq!(meta["features"], json!([9, 16, 1]));
}

#[test]
fn convert_policy_kind_requires_policy_size_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("policy.json");
    let target = dir.path().join("policy.graph.json");
    // Not a valid container; the parameter check must fire first.
    fs::write(&source, b"not a checkpoint").unwrap();

    let out = Command::new(weightbridge_bin())
        .args([
            "convert",
            "--schema",
            "go-json-v2-policy",
            "--in",
            source.to_str().unwrap(),
            "--out",
            target.to_str().unwrap(),
            "--kind",
            "policy",
            "--input-size",
            "9",
            "--hidden-size",
            "16",
            "--policy-activation",
            "softmax",
        ])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("params: missing required parameter `policy_output_size`"),
        "stderr:\n{stderr}"
    );
    assert!(!target.exists());
}

#[test]
fn run_executes_every_plan_entry() {
    let dir = tempfile::tempdir().unwrap();
    let value_src = dir.path().join("value.json");
    let policy_src = dir.path().join("policy.json");
    let value_dst = dir.path().join("value.graph.json");
    let policy_dst = dir.path().join("policy.graph.json");
    fs::write(&value_src, value_dump(9, 16)).unwrap();
    fs::write(&policy_src, policy_dump_v2(9, 16, 3)).unwrap();

    let plan = format!(
        r#"conversions:
  - schema: go-json-v1-value
    source: {}
    target: {}
    kind: value
    input_size: 9
    hidden_size: 16
  - schema: go-json-v2-policy
    source: {}
    target: {}
    kind: policy
    input_size: 9
    hidden_size: 16
    policy_output_size: 3
    policy_activation: log_softmax
"#,
        value_src.display(),
        value_dst.display(),
        policy_src.display(),
        policy_dst.display(),
    );
    let plan_path = dir.path().join("plan.yaml");
    fs::write(&plan_path, plan).unwrap();

    let out = Command::new(weightbridge_bin())
        .args(["run", "--config", plan_path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(String::from_utf8_lossy(&out.stdout).contains("2 ok, 0 failed"));

    assert!(value_dst.exists());
    assert!(policy_dst.exists());
    let doc: Value = serde_json::from_slice(&fs::read(&policy_dst).unwrap()).unwrap();
    assert_eq!(doc["kind"], "policy");
    assert_eq!(doc["ops"][3]["op"], "log_softmax");
}

#[test]
fn run_keeps_going_and_exits_nonzero_on_entry_failure() {
    let dir = tempfile::tempdir().unwrap();
    let value_src = dir.path().join("value.json");
    let value_dst = dir.path().join("value.graph.json");
    let bad_dst = dir.path().join("bad.graph.json");
    fs::write(&value_src, value_dump(9, 16)).unwrap();

    let plan = format!(
        r#"conversions:
  - schema: go-json-v9-value
    source: {src}
    target: {bad}
    kind: value
    input_size: 9
    hidden_size: 16
  - schema: go-json-v1-value
    source: {src}
    target: {good}
    kind: value
    input_size: 9
    hidden_size: 16
"#,
        src = value_src.display(),
        bad = bad_dst.display(),
        good = value_dst.display(),
    );
    let plan_path = dir.path().join("plan.yaml");
    fs::write(&plan_path, plan).unwrap();

    let out = Command::new(weightbridge_bin())
        .args(["run", "--config", plan_path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("schema: unknown schema id `go-json-v9-value`"),
        "stderr:\n{stderr}"
    );
    assert!(String::from_utf8_lossy(&out.stdout).contains("1 ok, 1 failed"));

    // The bad entry wrote nothing; the good one still ran.
    assert!(!bad_dst.exists());
    assert!(value_dst.exists());
}

#[test]
fn schemas_lists_every_registered_descriptor() {
    let out = Command::new(weightbridge_bin())
        .args(["schemas"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("go-json-v1-value"));
    assert!(stdout.contains("go-json-v1-policy"));
    assert!(stdout.contains("go-json-v2-policy"));
    assert!(stdout.contains("state-map-v1"));
    assert!(stdout.contains("state-map-v2"));
    assert!(stdout.contains("weightsInputHiddenPolicy"));
    assert!(stdout.contains("layer1.weight"));
    assert!(stdout.contains("(json-dump)"));
    assert!(stdout.contains("(tensor-map)"));
}

#[test]
fn unknown_command_fails() {
    let out = Command::new(weightbridge_bin())
        .args(["frobnicate"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unknown command"));
}
