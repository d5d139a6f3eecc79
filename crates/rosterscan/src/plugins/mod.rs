//! External collaborators of the import pipeline.
//!
//! The pipeline never talks to an OCR engine, an employee database, or a shift
//! database directly. It consumes them through three narrow async traits:
//!
//! - [`OcrBackend`] - recognizes text fragments on a (rotated) page image
//! - [`EmployeeDirectory`] - resolves a parsed name to an employee
//! - [`ShiftStore`] - answers duplicate checks and persists shifts
//!
//! All three extend [`Plugin`] for naming and lifecycle. In-memory and
//! precomputed implementations live in [`memory`] and [`precomputed`].

mod directory;
pub mod memory;
mod ocr;
pub mod precomputed;
mod store;
mod traits;

pub use directory::EmployeeDirectory;
pub use memory::{InMemoryDirectory, InMemoryShiftStore, ShiftSource, StoredShift};
pub use ocr::OcrBackend;
pub use precomputed::PrecomputedOcr;
pub use store::ShiftStore;
pub use traits::Plugin;
