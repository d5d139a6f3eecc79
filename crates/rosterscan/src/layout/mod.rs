//! Geometric layout inference over OCR fragments.
//!
//! - [`orientation`] - choose the page rotation that reads most like a schedule
//! - [`lines`] - bucket fragments into rows and repair split rows
//! - [`header`] - find the day-of-week header and its column positions
//! - [`dates`] - bind calendar dates to columns
//! - [`columns`] - split data rows into a name and per-column cells

pub mod columns;
pub mod dates;
pub mod header;
pub mod lines;
pub mod orientation;

pub use columns::{ClassifiedRow, classify_row};
pub use dates::{ColumnDates, DateToken, detect_date_row, heal_date, map_dates, resolve_column_date, virtual_anchor};
pub use header::locate_header;
pub use lines::reconstruct_lines;
pub use orientation::{Orientation, recognize_with_retry, resolve_orientation, score_fragments};
