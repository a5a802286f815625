//! In-memory model types shared by the reconstructor and the exporter.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::build::BuildError;

/// Nonlinearity applied after a layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Identity,
    Relu,
    Tanh,
    Softmax,
    LogSoftmax,
}

impl Activation {
    pub fn as_str(self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Relu => "relu",
            Activation::Tanh => "tanh",
            Activation::Softmax => "softmax",
            Activation::LogSoftmax => "log_softmax",
        }
    }
}

/// Which head the source network carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Policy,
    Value,
}

impl NetworkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkKind::Policy => "policy",
            NetworkKind::Value => "value",
        }
    }
}

impl FromStr for NetworkKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, BuildError> {
        match s {
            "policy" => Ok(NetworkKind::Policy),
            "value" => Ok(NetworkKind::Value),
            other => Err(BuildError::UnsupportedKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Final policy-head activation.
///
/// Always explicit in the call: the producing system has shipped both
/// probability-normalized and log-probability heads, and downstream consumers
/// depend on one or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyActivation {
    Softmax,
    LogSoftmax,
}

impl PolicyActivation {
    pub fn activation(self) -> Activation {
        match self {
            PolicyActivation::Softmax => Activation::Softmax,
            PolicyActivation::LogSoftmax => Activation::LogSoftmax,
        }
    }
}

/// Declared architecture hyperparameters.
///
/// The container is validated against these; sizes are never inferred from
/// container contents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArchParams {
    pub input_size: usize,
    pub hidden_size: usize,
    /// Action count for policy networks. Value networks always emit one output.
    #[serde(default)]
    pub policy_output_size: Option<usize>,
}

impl ArchParams {
    /// Fail fast on parameters the requested kind requires, before any
    /// container bytes are touched.
    pub fn validate(
        &self,
        kind: NetworkKind,
        policy_activation: Option<PolicyActivation>,
    ) -> Result<(), BuildError> {
        if kind == NetworkKind::Policy {
            if self.policy_output_size.is_none() {
                return Err(BuildError::MissingParam {
                    name: "policy_output_size",
                });
            }
            if policy_activation.is_none() {
                return Err(BuildError::MissingParam {
                    name: "policy_activation",
                });
            }
        }
        Ok(())
    }
}

/// One dense layer: flat row-major weights of shape
/// `[out_features, in_features]`, bias of length `out_features`, and the
/// activation applied after the affine transform.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub in_features: usize,
    pub out_features: usize,
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

/// Validated in-memory model: ordered layers plus the architecture they encode.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGraph {
    pub kind: NetworkKind,
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub layers: Vec<LayerSpec>,
}
