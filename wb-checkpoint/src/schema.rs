//! Source checkpoint schemas and the descriptor registry.
//!
//! Every supported container version is described by a static
//! [`SchemaDescriptor`] naming the concrete weight/bias field for each layer.
//! Descriptors are versioned explicitly and never sniffed from content: the
//! producing system has renamed logically identical fields across versions
//! (`weightsInputHidden` vs `weightsInputHiddenPolicy`, `fc1.*` vs
//! `layer1.*`), and guessing risks loading the wrong tensor under the right
//! role.

use thiserror::Error;

/// Registry lookup errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown schema id `{id}`")]
    UnknownSchema { id: String },
}

/// How the raw container bytes are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Flat JSON object; ranks inferred from array nesting depth.
    JsonDump,
    /// safetensors container; tensor shapes are authoritative.
    TensorMap,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::JsonDump => "json-dump",
            SourceKind::TensorMap => "tensor-map",
        }
    }
}

/// Concrete field names holding one layer's parameters.
#[derive(Debug, Clone, Copy)]
pub struct LayerFields {
    pub weight: &'static str,
    pub bias: &'static str,
}

/// Field mapping for one container version.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDescriptor {
    pub id: &'static str,
    pub source_kind: SourceKind,
    /// Layer parameter fields in network order (hidden first, output last).
    pub layers: &'static [LayerFields],
}

/// JSON dump from the v1 value-network trainer. `biasOutput` is a bare scalar.
pub const GO_JSON_V1_VALUE: &str = "go-json-v1-value";
/// JSON dump from the v1 policy-network trainer. `biasesOutput` is a vector.
pub const GO_JSON_V1_POLICY: &str = "go-json-v1-policy";
/// JSON dump with the later `...Policy`-suffixed field names.
pub const GO_JSON_V2_POLICY: &str = "go-json-v2-policy";
/// Native state map keyed `fc1.*` / `fc2.*`.
pub const STATE_MAP_V1: &str = "state-map-v1";
/// Native state map keyed `layer1.*` / `layer2.*`.
pub const STATE_MAP_V2: &str = "state-map-v2";

static DESCRIPTORS: &[SchemaDescriptor] = &[
    SchemaDescriptor {
        id: GO_JSON_V1_VALUE,
        source_kind: SourceKind::JsonDump,
        layers: &[
            LayerFields {
                weight: "weightsInputHidden",
                bias: "biasesHidden",
            },
            LayerFields {
                weight: "weightsHiddenOutput",
                bias: "biasOutput",
            },
        ],
    },
    SchemaDescriptor {
        id: GO_JSON_V1_POLICY,
        source_kind: SourceKind::JsonDump,
        layers: &[
            LayerFields {
                weight: "weightsInputHidden",
                bias: "biasesHidden",
            },
            LayerFields {
                weight: "weightsHiddenOutput",
                bias: "biasesOutput",
            },
        ],
    },
    SchemaDescriptor {
        id: GO_JSON_V2_POLICY,
        source_kind: SourceKind::JsonDump,
        layers: &[
            LayerFields {
                weight: "weightsInputHiddenPolicy",
                bias: "biasesHiddenPolicy",
            },
            LayerFields {
                weight: "weightsHiddenOutputPolicy",
                bias: "biasesOutputPolicy",
            },
        ],
    },
    SchemaDescriptor {
        id: STATE_MAP_V1,
        source_kind: SourceKind::TensorMap,
        layers: &[
            LayerFields {
                weight: "fc1.weight",
                bias: "fc1.bias",
            },
            LayerFields {
                weight: "fc2.weight",
                bias: "fc2.bias",
            },
        ],
    },
    SchemaDescriptor {
        id: STATE_MAP_V2,
        source_kind: SourceKind::TensorMap,
        layers: &[
            LayerFields {
                weight: "layer1.weight",
                bias: "layer1.bias",
            },
            LayerFields {
                weight: "layer2.weight",
                bias: "layer2.bias",
            },
        ],
    },
];

/// Look up a registered descriptor by id.
pub fn resolve(schema_id: &str) -> Result<&'static SchemaDescriptor, SchemaError> {
    DESCRIPTORS
        .iter()
        .find(|d| d.id == schema_id)
        .ok_or_else(|| SchemaError::UnknownSchema {
            id: schema_id.to_string(),
        })
}

/// All registered descriptors, in registration order.
pub fn schemas() -> &'static [SchemaDescriptor] {
    DESCRIPTORS
}
