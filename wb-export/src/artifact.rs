//! Portable graph document + forward dry-run validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use wb_graph::{Activation, ModelGraph};

/// Artifact format identifier.
pub const ARTIFACT_FORMAT: &str = "mlp-graph";
/// Increment when the document layout changes.
pub const ARTIFACT_VERSION: u32 = 1;

/// Name of the overall graph input tensor. Fixed across invocations so
/// artifacts stay structurally comparable.
pub const INPUT_NAME: &str = "input";
/// Name of the final graph output tensor.
pub const OUTPUT_NAME: &str = "output";
/// Symbolic leading dimension, unbound until load time.
pub const BATCH_DIM: &str = "batch_size";

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("model has no layers")]
    EmptyGraph,
    #[error("activation `{activation}` has no graph op equivalent")]
    UnsupportedActivation { activation: &'static str },
    #[error("dry run at layer {layer}: shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        layer: usize,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// One tensor dimension: symbolic (a name like `batch_size`) or fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dim {
    Symbolic(String),
    Fixed(usize),
}

/// A named tensor endpoint with its declared dims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorDecl {
    pub name: String,
    pub dims: Vec<Dim>,
}

/// One graph operation. `affine` carries its parameters inline, flat
/// row-major `[out_features, in_features]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GraphOp {
    Affine {
        input: String,
        output: String,
        in_features: usize,
        out_features: usize,
        weight: Vec<f32>,
        bias: Vec<f32>,
    },
    Relu {
        input: String,
        output: String,
    },
    Tanh {
        input: String,
        output: String,
    },
    Softmax {
        input: String,
        output: String,
    },
    LogSoftmax {
        input: String,
        output: String,
    },
}

/// The serialized computational graph.
///
/// Serialization is deterministic: identical models produce byte-identical
/// documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub format: String,
    pub version: u32,
    pub kind: String,
    pub input: TensorDecl,
    pub output: TensorDecl,
    pub ops: Vec<GraphOp>,
}

impl ExportArtifact {
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ExportError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Serialize `model` into an artifact.
///
/// Emits one affine op plus one activation op per layer, in layer order.
/// Intermediate value names are deterministic (`dense{i}`, `act{i}`); the
/// final activation writes to the fixed output name. Before returning, a
/// forward dry-run with one synthetic batch row validates the op sequence
/// end-to-end against the declared shapes.
pub fn export(model: &ModelGraph) -> Result<ExportArtifact, ExportError> {
    if model.layers.is_empty() {
        return Err(ExportError::EmptyGraph);
    }

    let n = model.layers.len();
    let mut ops = Vec::with_capacity(n * 2);
    let mut current = INPUT_NAME.to_string();
    for (i, layer) in model.layers.iter().enumerate() {
        let dense = format!("dense{i}");
        ops.push(GraphOp::Affine {
            input: current,
            output: dense.clone(),
            in_features: layer.in_features,
            out_features: layer.out_features,
            weight: layer.weight.clone(),
            bias: layer.bias.clone(),
        });

        let act_out = if i + 1 == n {
            OUTPUT_NAME.to_string()
        } else {
            format!("act{i}")
        };
        ops.push(activation_op(layer.activation, dense, act_out.clone())?);
        current = act_out;
    }

    let artifact = ExportArtifact {
        format: ARTIFACT_FORMAT.to_string(),
        version: ARTIFACT_VERSION,
        kind: model.kind.as_str().to_string(),
        input: TensorDecl {
            name: INPUT_NAME.to_string(),
            dims: vec![
                Dim::Symbolic(BATCH_DIM.to_string()),
                Dim::Fixed(model.input_size),
            ],
        },
        output: TensorDecl {
            name: OUTPUT_NAME.to_string(),
            dims: vec![
                Dim::Symbolic(BATCH_DIM.to_string()),
                Dim::Fixed(model.output_size),
            ],
        },
        ops,
    };
    dry_run(&artifact)?;
    Ok(artifact)
}

fn activation_op(a: Activation, input: String, output: String) -> Result<GraphOp, ExportError> {
    match a {
        Activation::Relu => Ok(GraphOp::Relu { input, output }),
        Activation::Tanh => Ok(GraphOp::Tanh { input, output }),
        Activation::Softmax => Ok(GraphOp::Softmax { input, output }),
        Activation::LogSoftmax => Ok(GraphOp::LogSoftmax { input, output }),
        Activation::Identity => Err(ExportError::UnsupportedActivation {
            activation: a.as_str(),
        }),
    }
}

fn trailing_fixed(decl: &TensorDecl) -> usize {
    decl.dims
        .iter()
        .rev()
        .find_map(|d| match d {
            Dim::Fixed(n) => Some(*n),
            Dim::Symbolic(_) => None,
        })
        .unwrap_or(0)
}

/// Evaluate the op sequence on one synthetic batch row, verifying every
/// declared shape end-to-end including the declared output width. Any
/// inconsistency is a `ShapeMismatch` naming the offending layer.
fn dry_run(artifact: &ExportArtifact) -> Result<(), ExportError> {
    let mut values: BTreeMap<&str, Vec<f32>> = BTreeMap::new();
    values.insert(
        artifact.input.name.as_str(),
        vec![0.0; trailing_fixed(&artifact.input)],
    );

    let mut layer = 0usize;
    for op in &artifact.ops {
        match op {
            GraphOp::Affine {
                input,
                output,
                in_features,
                out_features,
                weight,
                bias,
            } => {
                let x = lookup(&values, input, layer, *in_features)?;
                if x.len() != *in_features {
                    return Err(ExportError::ShapeMismatch {
                        layer,
                        expected: vec![*in_features],
                        actual: vec![x.len()],
                    });
                }
                if weight.len() != out_features * in_features {
                    return Err(ExportError::ShapeMismatch {
                        layer,
                        expected: vec![*out_features, *in_features],
                        actual: vec![weight.len()],
                    });
                }
                if bias.len() != *out_features {
                    return Err(ExportError::ShapeMismatch {
                        layer,
                        expected: vec![*out_features],
                        actual: vec![bias.len()],
                    });
                }

                let mut y = Vec::with_capacity(*out_features);
                for o in 0..*out_features {
                    let row = &weight[o * in_features..(o + 1) * in_features];
                    let mut acc = bias[o];
                    for (w, xv) in row.iter().zip(x.iter()) {
                        acc += w * xv;
                    }
                    y.push(acc);
                }
                values.insert(output.as_str(), y);
                layer += 1;
            }
            GraphOp::Relu { input, output } => {
                let x = lookup(&values, input, layer.saturating_sub(1), 0)?;
                let y = x.iter().map(|v| v.max(0.0)).collect();
                values.insert(output.as_str(), y);
            }
            GraphOp::Tanh { input, output } => {
                let x = lookup(&values, input, layer.saturating_sub(1), 0)?;
                let y = x.iter().map(|v| v.tanh()).collect();
                values.insert(output.as_str(), y);
            }
            GraphOp::Softmax { input, output } => {
                let x = lookup(&values, input, layer.saturating_sub(1), 0)?;
                values.insert(output.as_str(), softmax(x));
            }
            GraphOp::LogSoftmax { input, output } => {
                let x = lookup(&values, input, layer.saturating_sub(1), 0)?;
                values.insert(output.as_str(), log_softmax(x));
            }
        }
    }

    let out_width = trailing_fixed(&artifact.output);
    let last = layer.saturating_sub(1);
    let Some(out) = values.get(artifact.output.name.as_str()) else {
        return Err(ExportError::ShapeMismatch {
            layer: last,
            expected: vec![out_width],
            actual: Vec::new(),
        });
    };
    if out.len() != out_width {
        return Err(ExportError::ShapeMismatch {
            layer: last,
            expected: vec![out_width],
            actual: vec![out.len()],
        });
    }
    Ok(())
}

fn lookup<'a>(
    values: &'a BTreeMap<&str, Vec<f32>>,
    name: &str,
    layer: usize,
    expected_width: usize,
) -> Result<&'a Vec<f32>, ExportError> {
    values.get(name).ok_or(ExportError::ShapeMismatch {
        layer,
        expected: vec![expected_width],
        actual: Vec::new(),
    })
}

fn softmax(v: &[f32]) -> Vec<f32> {
    let max = v.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exps: Vec<f32> = v.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

fn log_softmax(v: &[f32]) -> Vec<f32> {
    let max = v.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let log_sum: f32 = v.iter().map(|x| (x - max).exp()).sum::<f32>().ln();
    v.iter().map(|x| x - max - log_sum).collect()
}
