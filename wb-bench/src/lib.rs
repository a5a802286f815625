//! wb-bench: deterministic synthetic checkpoints for the criterion benches.

use std::collections::BTreeMap;

use safetensors::tensor::{Dtype, TensorView};
use serde_json::json;

/// Splitmix-style stream of small weights in `[-1, 1)`.
struct WeightStream {
    x: u64,
}

impl WeightStream {
    fn new() -> Self {
        Self {
            x: 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next(&mut self) -> f64 {
        self.x = self
            .x
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.x >> 32) as f64 / (1u64 << 31) as f64) - 1.0
    }

    fn matrix(&mut self, rows: usize, cols: usize) -> Vec<Vec<f64>> {
        (0..rows)
            .map(|_| (0..cols).map(|_| self.next()).collect())
            .collect()
    }

    fn vector(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.next()).collect()
    }
}

/// A `go-json-v1-value` dump with the given architecture.
pub fn synthetic_value_dump(input: usize, hidden: usize) -> Vec<u8> {
    let mut w = WeightStream::new();
    let dump = json!({
        "inputSize": input,
        "hiddenSize": hidden,
        "weightsInputHidden": w.matrix(hidden, input),
        "biasesHidden": w.vector(hidden),
        "weightsHiddenOutput": w.matrix(1, hidden),
        "biasOutput": w.next(),
    });
    serde_json::to_vec(&dump).unwrap_or_default()
}

/// A `state-map-v1` container with the given architecture.
pub fn synthetic_state_map(input: usize, hidden: usize) -> Vec<u8> {
    let mut w = WeightStream::new();
    let flat = |w: &mut WeightStream, n: usize| -> Vec<u8> {
        let values: Vec<f32> = (0..n).map(|_| w.next() as f32).collect();
        bytemuck::cast_slice(&values).to_vec()
    };
    let owned: Vec<(String, Vec<usize>, Vec<u8>)> = vec![
        (
            "fc1.weight".to_string(),
            vec![hidden, input],
            flat(&mut w, hidden * input),
        ),
        ("fc1.bias".to_string(), vec![hidden], flat(&mut w, hidden)),
        ("fc2.weight".to_string(), vec![1, hidden], flat(&mut w, hidden)),
        ("fc2.bias".to_string(), vec![1], flat(&mut w, 1)),
    ];

    let mut tensors: BTreeMap<String, TensorView<'_>> = BTreeMap::new();
    for (n, s, b) in &owned {
        if let Ok(view) = TensorView::new(Dtype::F32, s.clone(), b) {
            tensors.insert(n.clone(), view);
        }
    }
    safetensors::serialize(&tensors, &None).unwrap_or_default()
}
