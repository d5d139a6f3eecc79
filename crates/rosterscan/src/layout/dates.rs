//! Date row detection and binding of calendar dates to columns.
//!
//! Date rows are OCR'd as badly as everything else: slashes get lost or
//! doubled, and a stray digit lands on the year. Raw matches go through
//! [`heal_date`] before they count toward a date row.

use crate::types::{ColumnSet, Row};
use chrono::{Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Calendar date per column index.
pub type ColumnDates = BTreeMap<usize, NaiveDate>;

static DOUBLE_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/{2,}").expect("Double slash regex pattern is valid and should compile"));
static SPACED_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+/\s*|\s*/\s+").expect("Spaced slash regex pattern is valid and should compile"));
static DATE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,6}/\d{1,6}(?:/\d{2,4})?").expect("Date-like regex pattern is valid and should compile")
});

/// A healed date and the horizontal position it was read at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateToken {
    pub date: NaiveDate,
    pub x_center: f64,
}

/// Collapse doubled slashes and spacing around slashes.
pub fn clean_date_text(text: &str) -> Cow<'_, str> {
    let mut text = Cow::Borrowed(text);
    if DOUBLE_SLASH.is_match(&text) {
        text = Cow::Owned(DOUBLE_SLASH.replace_all(&text, "/").into_owned());
    }
    if SPACED_SLASH.is_match(&text) {
        text = Cow::Owned(SPACED_SLASH.replace_all(&text, "/").into_owned());
    }
    text
}

fn full_year(digits: &str) -> Option<i32> {
    let value: i32 = digits.parse().ok()?;
    match digits.len() {
        2 => Some(2000 + value),
        4 if (1900..2100).contains(&value) => Some(value),
        // A stray trailing digit on a two-digit year.
        3 | 4 => digits[..2].parse::<i32>().ok().map(|v| 2000 + v),
        _ => None,
    }
}

fn build(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Split a month/day run that lost its slash (`106` -> 10/6).
///
/// The first split producing a valid date wins, preferring day parts
/// without a leading zero.
fn split_month_day(run: &str, year: i32) -> Option<NaiveDate> {
    let candidates: Vec<(usize, NaiveDate)> = (1..=2.min(run.len() - 1))
        .filter_map(|at| build(year, &run[..at], &run[at..]).map(|date| (at, date)))
        .collect();

    candidates
        .iter()
        .find(|(at, _)| !run[*at..].starts_with('0'))
        .or_else(|| candidates.first())
        .map(|(_, date)| *date)
}

/// Repair one raw `M/D[/Y]` match into a calendar date.
///
/// Dates are month-first. A missing year comes from `reference`; a day part
/// running into the reference's two-digit year (`1/625`) has the year split
/// back off.
pub fn heal_date(raw: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split('/').collect();
    let known_year = format!("{:02}", reference.year().rem_euclid(100));

    match parts.as_slice() {
        [month, day, year] => {
            if month.len() > 2 || day.len() > 2 {
                return None;
            }
            build(full_year(year)?, month, day)
        }
        [month, day] if month.len() >= 3 => split_month_day(month, full_year(day)?),
        [month, day] if day.len() >= 3 && day.ends_with(known_year.as_str()) => {
            let day = &day[..day.len() - 2];
            build(reference.year(), month, day).filter(|_| day.len() <= 2)
        }
        [month, day] if day.len() <= 2 => build(reference.year(), month, day),
        _ => None,
    }
}

/// Healed dates in a row, positioned proportionally within their fragments.
pub fn extract_dates(row: &Row, reference: NaiveDate) -> Vec<DateToken> {
    let mut tokens = Vec::new();

    for fragment in &row.fragments {
        let text = clean_date_text(&fragment.text);
        let len = text.chars().count().max(1) as f64;

        for m in DATE_LIKE.find_iter(&text) {
            let Some(date) = heal_date(m.as_str(), reference) else {
                tracing::debug!("Discarding unreadable date '{}'", m.as_str());
                continue;
            };
            let start = text[..m.start()].chars().count() as f64;
            let mid = start + m.as_str().chars().count() as f64 / 2.0;
            tokens.push(DateToken {
                date,
                x_center: fragment.left() + fragment.width() * (mid / len),
            });
        }
    }

    tokens
}

/// The row's dates, if it holds at least `min_tokens` of them.
pub fn detect_date_row(row: &Row, reference: NaiveDate, min_tokens: usize) -> Option<Vec<DateToken>> {
    let tokens = extract_dates(row, reference);
    if tokens.len() >= min_tokens.max(1) {
        Some(tokens)
    } else {
        None
    }
}

/// Bind each date to its nearest column within `max_distance`.
pub fn map_dates(tokens: &[DateToken], columns: &ColumnSet, max_distance: f64) -> ColumnDates {
    let mut dates = ColumnDates::new();

    for token in tokens {
        match columns.nearest(token.x_center) {
            Some((index, distance)) if distance <= max_distance => {
                dates.entry(index).or_insert(token.date);
            }
            _ => tracing::debug!(
                "Date {} at x={:.0} is not near any column",
                token.date,
                token.x_center
            ),
        }
    }

    dates
}

/// Monday of the week containing `reference`.
pub fn virtual_anchor(reference: NaiveDate) -> NaiveDate {
    reference - Days::new(u64::from(reference.weekday().num_days_from_monday()))
}

fn offset(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Date of `column`: its explicit date, else consecutive days counted from the
/// nearest explicitly dated column, else consecutive days from `anchor`.
pub fn resolve_column_date(dates: &ColumnDates, column: usize, anchor: NaiveDate) -> Option<NaiveDate> {
    if let Some(date) = dates.get(&column) {
        return Some(*date);
    }

    let nearest = dates
        .iter()
        .min_by_key(|(index, _)| (**index as i64 - column as i64).abs());

    match nearest {
        Some((index, date)) => offset(*date, column as i64 - *index as i64),
        None => offset(anchor, column as i64),
    }
}
