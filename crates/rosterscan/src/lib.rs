//! rosterscan - Weekly Staffing Schedule Reconstruction
//!
//! rosterscan turns the OCR output of a photographed or scanned weekly
//! schedule (employee rows by day-of-week columns, each cell a time range or
//! "OFF") into structured shift candidates for a scheduling database.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rosterscan::{ImportConfig, ImportOptions, import_document};
//! use rosterscan::plugins::{InMemoryDirectory, InMemoryShiftStore, PrecomputedOcr};
//!
//! # async fn example() -> rosterscan::Result<()> {
//! let ocr = PrecomputedOcr::from_file("fragments.json")?;
//! let directory = InMemoryDirectory::from_json_file("employees.json")?;
//! let store = InMemoryShiftStore::new();
//!
//! let options = ImportOptions { dry_run: true, ..Default::default() };
//! let report = import_document(&ocr.page_images(), &ocr, &directory, &store, &options, &ImportConfig::default()).await?;
//! for shift in report.parsed_shifts.unwrap_or_default() {
//!     println!("{} {} {}-{}", shift.employee_name, shift.date, shift.start_time, shift.end_time);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): the import pipeline and configuration
//! - **Layout** (`layout`): orientation, rows, header columns, date binding, cell assignment
//! - **Text** (`text`): time-range normalization and the location vocabulary
//! - **Schedule** (`schedule`): per-page parse state and shift materialization
//! - **Plugins** (`plugins`): OCR engine, employee directory, and shift store interfaces

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod layout;
pub mod plugins;
pub mod schedule;
pub mod text;
pub mod types;

pub use error::{Result, RosterError};
pub use types::*;

pub use core::config::{ImportConfig, LayoutConfig, LocationConfig, OcrConfig, TimeConfig};
pub use core::pipeline::import_document;
pub use text::time::{ParseOutcome, parse_time_cell};
