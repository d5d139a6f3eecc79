pub mod location;
pub mod time;

pub use location::{CellSplit, LocationHit, LocationMatcher, SectionMatch};
pub use time::{
    CORRECTION_RULES, CorrectionRule, ParseOutcome, count_time_ranges, first_time_range, is_off_marker,
    normalize_cell, parse_time_cell,
};
