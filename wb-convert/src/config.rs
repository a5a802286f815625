//! Conversion plan configuration.
//!
//! A plan is a YAML file listing conversions to run in order; it is what
//! `weightbridge run` consumes. Each entry carries everything one conversion
//! needs, so a plan is reproducible on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use wb_graph::{ArchParams, NetworkKind, PolicyActivation};

/// Plan loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read plan file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Root plan structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionPlan {
    pub conversions: Vec<ConversionEntry>,
}

/// One source-to-artifact conversion.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionEntry {
    /// Registry schema id, e.g. `go-json-v1-value`.
    pub schema: String,
    /// Source checkpoint path.
    pub source: PathBuf,
    /// Artifact destination path.
    pub target: PathBuf,
    pub kind: NetworkKind,
    pub input_size: usize,
    pub hidden_size: usize,
    /// Required for policy networks.
    #[serde(default)]
    pub policy_output_size: Option<usize>,
    /// Required for policy networks.
    #[serde(default)]
    pub policy_activation: Option<PolicyActivation>,
}

impl ConversionEntry {
    pub fn arch(&self) -> ArchParams {
        ArchParams {
            input_size: self.input_size,
            hidden_size: self.hidden_size,
            policy_output_size: self.policy_output_size,
        }
    }
}

impl ConversionPlan {
    /// Load a plan from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let plan: ConversionPlan = serde_yaml::from_str(&contents)?;
        Ok(plan)
    }

    /// Load a plan from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let plan: ConversionPlan = serde_yaml::from_str(yaml)?;
        Ok(plan)
    }
}
