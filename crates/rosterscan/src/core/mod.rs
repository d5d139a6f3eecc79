//! Import orchestration and configuration.
//!
//! - **Pipeline** (`pipeline`): the `import_document()` entry point, which runs
//!   orientation, line reconstruction, row classification, and materialization
//!   over every page of a document
//! - **Configuration** (`config`): thresholds, time parsing policy, location
//!   vocabulary, and OCR call limits, loadable from TOML, YAML, or JSON
//!
//! # Example
//!
//! ```rust
//! use rosterscan::core::config::ImportConfig;
//!
//! let config = ImportConfig::default();
//! assert_eq!(config.layout.row_tolerance_px, 35.0);
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod pipeline;

pub use config::{ImportConfig, LayoutConfig, LocationConfig, OcrConfig, TimeConfig};
pub use pipeline::import_document;
