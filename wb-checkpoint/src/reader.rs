//! Container parsing for both source kinds.

use std::collections::BTreeMap;

use safetensors::SafeTensors;
use safetensors::tensor::Dtype;
use thiserror::Error;

use crate::schema::{SchemaDescriptor, SourceKind};

/// Reader errors.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("malformed container: {reason}")]
    MalformedContainer { reason: String },
    #[error("missing field `{field}`")]
    MissingField { field: String },
}

fn malformed(field: &str, what: &str) -> ReadError {
    ReadError::MalformedContainer {
        reason: format!("field `{field}`: {what}"),
    }
}

/// One named numeric array extracted from a container.
///
/// `shape` is `[]` for a bare scalar, `[n]` for a vector and `[rows, cols]`
/// for a matrix. `values` is flat row-major and always `f32`; wider source
/// values are narrowed on read so a single artifact never mixes widths.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorField {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl TensorField {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// Field map produced by [`read`], keyed by concrete source field name.
pub type FieldMap = BTreeMap<String, TensorField>;

/// Parse `source` according to `descriptor`.
///
/// Fields are fetched in descriptor order (layer by layer, weight before
/// bias) and the first absent one fails with [`ReadError::MissingField`].
/// Container fields the descriptor does not name are ignored.
pub fn read(source: &[u8], descriptor: &SchemaDescriptor) -> Result<FieldMap, ReadError> {
    match descriptor.source_kind {
        SourceKind::JsonDump => read_json_dump(source, descriptor),
        SourceKind::TensorMap => read_tensor_map(source, descriptor),
    }
}

fn required_fields(descriptor: &SchemaDescriptor) -> impl Iterator<Item = &'static str> {
    descriptor.layers.iter().flat_map(|l| [l.weight, l.bias])
}

fn read_json_dump(source: &[u8], descriptor: &SchemaDescriptor) -> Result<FieldMap, ReadError> {
    let root: serde_json::Value =
        serde_json::from_slice(source).map_err(|e| ReadError::MalformedContainer {
            reason: e.to_string(),
        })?;
    let Some(obj) = root.as_object() else {
        return Err(ReadError::MalformedContainer {
            reason: "top level is not an object".to_string(),
        });
    };

    let mut out = FieldMap::new();
    for name in required_fields(descriptor) {
        let Some(value) = obj.get(name) else {
            return Err(ReadError::MissingField {
                field: name.to_string(),
            });
        };
        out.insert(name.to_string(), tensor_from_json(name, value)?);
    }
    Ok(out)
}

/// Rank is the nesting depth: `0.5` is a scalar, `[..]` a vector, `[[..]]` a
/// matrix. Matrices must be rectangular.
fn tensor_from_json(name: &str, value: &serde_json::Value) -> Result<TensorField, ReadError> {
    if let Some(x) = value.as_f64() {
        return Ok(TensorField {
            name: name.to_string(),
            shape: Vec::new(),
            values: vec![x as f32],
        });
    }
    let Some(items) = value.as_array() else {
        return Err(malformed(name, "expected a number or an array"));
    };

    let two_d = items.first().is_some_and(|v| v.is_array());
    if !two_d {
        let mut values = Vec::with_capacity(items.len());
        for v in items {
            let Some(x) = v.as_f64() else {
                return Err(malformed(name, "non-numeric element"));
            };
            values.push(x as f32);
        }
        return Ok(TensorField {
            name: name.to_string(),
            shape: vec![items.len()],
            values,
        });
    }

    let Some(cols) = items[0].as_array().map(|r| r.len()) else {
        return Err(malformed(name, "mixed nesting"));
    };
    let mut values = Vec::with_capacity(items.len() * cols);
    for row in items {
        let Some(row) = row.as_array() else {
            return Err(malformed(name, "mixed nesting"));
        };
        if row.len() != cols {
            return Err(malformed(name, "ragged rows"));
        }
        for v in row {
            if v.is_array() {
                return Err(malformed(name, "nesting deeper than two levels"));
            }
            let Some(x) = v.as_f64() else {
                return Err(malformed(name, "non-numeric element"));
            };
            values.push(x as f32);
        }
    }
    Ok(TensorField {
        name: name.to_string(),
        shape: vec![items.len(), cols],
        values,
    })
}

fn read_tensor_map(source: &[u8], descriptor: &SchemaDescriptor) -> Result<FieldMap, ReadError> {
    let st = SafeTensors::deserialize(source).map_err(|e| ReadError::MalformedContainer {
        reason: e.to_string(),
    })?;

    let mut out = FieldMap::new();
    for name in required_fields(descriptor) {
        let Ok(view) = st.tensor(name) else {
            return Err(ReadError::MissingField {
                field: name.to_string(),
            });
        };
        // The data section has no alignment guarantee, so decode bytewise.
        let values: Vec<f32> = match view.dtype() {
            Dtype::F32 => view
                .data()
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            Dtype::F64 => view
                .data()
                .chunks_exact(8)
                .map(|c| {
                    let mut b = [0u8; 8];
                    b.copy_from_slice(c);
                    f64::from_le_bytes(b) as f32
                })
                .collect(),
            other => {
                return Err(malformed(name, &format!("unsupported dtype {other:?}")));
            }
        };
        out.insert(
            name.to_string(),
            TensorField {
                name: name.to_string(),
                shape: view.shape().to_vec(),
                values,
            },
        );
    }
    Ok(out)
}
