//! Grouping of raw fragments into geometric rows.
//!
//! This is a single sweep over fragments sorted by vertical center, not real
//! layout analysis. Schedule rows are well separated vertically, so bucketing
//! against the first fragment of the running row is enough.

use crate::text::time::count_time_ranges;
use crate::types::{Row, TextFragment};

/// Group fragments into rows and repair rows split by the OCR engine.
pub fn reconstruct_lines(fragments: Vec<TextFragment>, tolerance: f64) -> Vec<Row> {
    merge_split_rows(group_rows(fragments, tolerance))
}

/// Bucket fragments into rows by vertical center.
///
/// A new row starts whenever a fragment's vertical center differs from the
/// running row's reference (its first fragment) by at least `tolerance`.
/// Fragments within each row are ordered left to right.
pub fn group_rows(mut fragments: Vec<TextFragment>, tolerance: f64) -> Vec<Row> {
    if fragments.is_empty() {
        return Vec::new();
    }

    fragments.sort_by(|a, b| a.y_center().total_cmp(&b.y_center()));

    let mut rows: Vec<Row> = Vec::new();
    let mut current: Vec<TextFragment> = Vec::new();
    let mut reference_y: Option<f64> = None;

    for fragment in fragments {
        let y = fragment.y_center();
        match reference_y {
            Some(row_y) if (y - row_y).abs() < tolerance => current.push(fragment),
            Some(_) => {
                rows.push(finish_row(std::mem::take(&mut current)));
                reference_y = Some(y);
                current.push(fragment);
            }
            None => {
                reference_y = Some(y);
                current.push(fragment);
            }
        }
    }

    if !current.is_empty() {
        rows.push(finish_row(current));
    }

    rows
}

fn finish_row(mut fragments: Vec<TextFragment>) -> Row {
    fragments.sort_by(|a, b| a.x_center().total_cmp(&b.x_center()));
    Row::new(fragments)
}

fn is_bare_small_number(token: &str) -> bool {
    (1..=2).contains(&token.len()) && token.chars().all(|c| c.is_ascii_digit())
}

fn looks_alphabetic(token: &str) -> bool {
    token.chars().any(char::is_alphabetic)
        && token
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, '.' | ',' | '\'' | '-'))
}

/// A time-only row whose first token is a stray digit, directly followed by
/// the name row it belongs to. A name row needs two alphabetic tokens, so a
/// lone section word is never pulled in.
fn is_split_pair(times: &Row, names: &Row) -> bool {
    let starts_with_digit = times.tokens().next().is_some_and(is_bare_small_number);
    if !starts_with_digit || count_time_ranges(&times.text()) < 2 {
        return false;
    }

    let leading: Vec<&str> = names.tokens().take(2).collect();
    leading.len() == 2 && leading.iter().all(|token| looks_alphabetic(token))
}

/// Drop the leading stray digit token from a row.
fn strip_leading_token(row: Row) -> Vec<TextFragment> {
    let mut fragments = row.fragments.into_iter();
    let Some(mut first) = fragments.next() else {
        return Vec::new();
    };

    let trimmed = first.text.trim_start();
    let token_len = trimmed.split_whitespace().next().map(str::len).unwrap_or(0);
    let rest = trimmed[token_len..].trim().to_string();

    let mut kept = Vec::new();
    if !rest.is_empty() {
        first.text = rest;
        kept.push(first);
    }
    kept.extend(fragments);
    kept
}

/// Merge rows the OCR engine split in two, name row first.
pub fn merge_split_rows(rows: Vec<Row>) -> Vec<Row> {
    let mut merged = Vec::with_capacity(rows.len());
    let mut iter = rows.into_iter().peekable();

    while let Some(row) = iter.next() {
        let split = iter.peek().is_some_and(|next| is_split_pair(&row, next));
        if split && let Some(names) = iter.next() {
            tracing::debug!("Merging split row '{}' into '{}'", row.text(), names.text());
            let mut fragments = names.fragments;
            fragments.extend(strip_leading_token(row));
            merged.push(Row::new(fragments));
            continue;
        }
        merged.push(row);
    }

    merged
}
