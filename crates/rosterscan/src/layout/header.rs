//! Day-of-week header detection.

use crate::types::{Column, ColumnSet, Row, TextFragment};
use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;

static DAY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)MON|TUE|WED|THU|FRI|SAT|SUN").expect("Day name regex pattern is valid and should compile"));

fn weekday_for(token: &str) -> Option<Weekday> {
    match token.to_ascii_uppercase().as_str() {
        "MON" => Some(Weekday::Mon),
        "TUE" => Some(Weekday::Tue),
        "WED" => Some(Weekday::Wed),
        "THU" => Some(Weekday::Thu),
        "FRI" => Some(Weekday::Fri),
        "SAT" => Some(Weekday::Sat),
        "SUN" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Day names appearing in `text`, in reading order.
pub fn day_names_in(text: &str) -> Vec<Weekday> {
    DAY_NAME
        .find_iter(text)
        .filter_map(|m| weekday_for(m.as_str()))
        .collect()
}

/// Number of whitespace tokens containing a day-name substring.
pub fn count_day_tokens(text: &str) -> usize {
    text.split_whitespace().filter(|token| DAY_NAME.is_match(token)).count()
}

/// Column candidates contributed by one fragment.
///
/// A fragment naming several days (a merged OCR cell) is divided into equal
/// width segments, one per day, whatever its internal spacing.
fn fragment_columns(fragment: &TextFragment) -> Vec<Column> {
    let days = day_names_in(&fragment.text);
    match days.len() {
        0 => Vec::new(),
        1 => vec![Column {
            x_center: fragment.x_center(),
            day: days[0],
        }],
        n => {
            let left = fragment.left();
            let segment = fragment.width() / n as f64;
            days.into_iter()
                .enumerate()
                .map(|(i, day)| Column {
                    x_center: left + segment * (i as f64 + 0.5),
                    day,
                })
                .collect()
        }
    }
}

/// Column candidates of a whole row, one per distinct day name.
pub fn column_candidates(row: &Row) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();
    for fragment in &row.fragments {
        for column in fragment_columns(fragment) {
            if columns.iter().all(|c| c.day != column.day) {
                columns.push(column);
            }
        }
    }
    columns
}

/// The column set defined by `row`, if it names at least `min_days` days.
pub fn locate_header(row: &Row, min_days: usize) -> Option<ColumnSet> {
    let columns = column_candidates(row);
    if columns.len() >= min_days.max(1) {
        Some(ColumnSet::new(columns))
    } else {
        None
    }
}
