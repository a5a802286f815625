//! Field map → validated [`ModelGraph`].

use thiserror::Error;
use wb_checkpoint::{FieldMap, SchemaDescriptor, TensorField};

use crate::model::{Activation, ArchParams, LayerSpec, ModelGraph, NetworkKind, PolicyActivation};

/// Reconstruction errors.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("layer {layer}: shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        layer: usize,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("unsupported network kind `{kind}` (expected `policy` or `value`)")]
    UnsupportedKind { kind: String },
    #[error("missing required parameter `{name}` for policy networks")]
    MissingParam { name: &'static str },
    #[error("missing field `{field}`")]
    MissingField { field: String },
}

/// Reconstruct a model from `fields`, consuming them.
///
/// Layers follow descriptor order. Weight orientation is
/// `[out_features, in_features]` exactly as trained; nothing is transposed
/// implicitly. A bare scalar bias is promoted to a length-1 vector when the
/// layer has a single output. Hidden layers get relu; the final layer gets
/// tanh for a value head and the requested activation for a policy head.
/// Container fields for the other network kind are simply left unconsumed.
pub fn build(
    descriptor: &SchemaDescriptor,
    mut fields: FieldMap,
    arch: &ArchParams,
    kind: NetworkKind,
    policy_activation: Option<PolicyActivation>,
) -> Result<ModelGraph, BuildError> {
    arch.validate(kind, policy_activation)?;
    let output_size = match kind {
        NetworkKind::Value => 1,
        NetworkKind::Policy => arch.policy_output_size.ok_or(BuildError::MissingParam {
            name: "policy_output_size",
        })?,
    };

    let n_layers = descriptor.layers.len();
    let mut layers = Vec::with_capacity(n_layers);
    for (i, lf) in descriptor.layers.iter().enumerate() {
        let in_features = if i == 0 {
            arch.input_size
        } else {
            arch.hidden_size
        };
        let out_features = if i + 1 == n_layers {
            output_size
        } else {
            arch.hidden_size
        };

        let weight = take_field(&mut fields, lf.weight)?;
        if weight.shape != [out_features, in_features] {
            return Err(BuildError::ShapeMismatch {
                layer: i,
                expected: vec![out_features, in_features],
                actual: weight.shape,
            });
        }

        let bias = take_field(&mut fields, lf.bias)?;
        let bias = promote_bias(i, bias, out_features)?;

        let activation = if i + 1 == n_layers {
            final_activation(kind, policy_activation)?
        } else {
            Activation::Relu
        };

        layers.push(LayerSpec {
            in_features,
            out_features,
            weight: weight.values,
            bias,
            activation,
        });
    }

    Ok(ModelGraph {
        kind,
        input_size: arch.input_size,
        hidden_size: arch.hidden_size,
        output_size,
        layers,
    })
}

fn take_field(fields: &mut FieldMap, name: &str) -> Result<TensorField, BuildError> {
    fields.remove(name).ok_or_else(|| BuildError::MissingField {
        field: name.to_string(),
    })
}

/// Bias shape must be `[out_features]`. A rank-0 field promotes to `[1]` for
/// single-output layers; the v1 value dump stores its output bias as a bare
/// scalar.
fn promote_bias(layer: usize, bias: TensorField, out_features: usize) -> Result<Vec<f32>, BuildError> {
    match bias.shape.as_slice() {
        [] if out_features == 1 => Ok(bias.values),
        [n] if *n == out_features => Ok(bias.values),
        _ => Err(BuildError::ShapeMismatch {
            layer,
            expected: vec![out_features],
            actual: bias.shape,
        }),
    }
}

fn final_activation(
    kind: NetworkKind,
    policy_activation: Option<PolicyActivation>,
) -> Result<Activation, BuildError> {
    match kind {
        NetworkKind::Value => Ok(Activation::Tanh),
        NetworkKind::Policy => policy_activation
            .map(PolicyActivation::activation)
            .ok_or(BuildError::MissingParam {
                name: "policy_activation",
            }),
    }
}
