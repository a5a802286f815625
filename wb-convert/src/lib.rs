//! wb-convert: checkpoint-to-artifact conversion, one request at a time.

pub mod config;
pub mod driver;

pub use config::{ConfigError, ConversionEntry, ConversionPlan};
pub use driver::{ConvertError, ConvertReport, ConvertRequest, LayerSummary, convert};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
