//! Schedule reconstruction: page parsing state, row classification, and
//! shift materialization.

pub mod materialize;
pub mod page;
pub mod state;

pub use materialize::{Materializer, row_candidates};
pub use page::{DataRow, ParsedPage, parse_page};
pub use state::{DocumentState, PageParseState};
