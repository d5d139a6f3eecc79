//! Time-range normalization and parsing for noisy schedule cells.
//!
//! OCR output for a cell such as `9:00A-5:00P` routinely arrives as
//! `9:OOA-5.00P`, `10B-6P`, `6:00P2:00A` or `1200PM-5PM`. Parsing runs in two
//! phases:
//!
//! 1. An ordered pipeline of pure correction rules ([`CORRECTION_RULES`]), each
//!    `&str -> Cow<str>`, rewrites the uppercased cell into a canonical
//!    `H:MM[A|P]-H:MM[A|P]` shape.
//! 2. The first `time-time` pair is extracted and each side is converted to a
//!    24-hour [`NaiveTime`] under the configured AM/PM policy.
//!
//! Every rule is public so it can be tested and reordered in isolation.

use crate::core::config::TimeConfig;
use crate::types::TimeRange;
use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// What a single cell turned into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParseOutcome {
    /// A valid start/end pair was extracted.
    Matched(TimeRange),
    /// No range was found but the text looked meaningful; kept for review.
    Fallback(String),
    /// The cell marks a day off or vacation.
    Off,
    /// Nothing usable in the cell.
    NoMatch,
}

/// A correction rule: one independent rewrite of the cell text.
pub type CorrectionRule = for<'a> fn(&'a str) -> Cow<'a, str>;

/// The correction pipeline, in application order.
pub const CORRECTION_RULES: &[(&str, CorrectionRule)] = &[
    ("meridiem_dots", normalize_meridiem_dots),
    ("lost_zero_minutes", repair_lost_zero_minutes),
    ("confusable_characters", substitute_confusables),
    ("separators", normalize_separators),
    ("merged_colon", repair_merged_colon),
    ("jammed_range", repair_jammed_range),
    ("meridiem_inference", infer_meridiem),
];

static OFF_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[O0]FF|VAC|VACA|VACATION|PTO|HOLIDAY|LOA)\b")
        .expect("Off marker regex pattern is valid and should compile")
});

static MERIDIEM_DOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([AP])\.\s*M\.?").expect("Meridiem dots regex pattern is valid and should compile"));

static DASH_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[_–—~]").expect("Dash-like regex pattern is valid and should compile"));
static WORD_TO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+TO\s+").expect("Range word regex pattern is valid and should compile"));
static DIGIT_PUNCT_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)\s*[.;,:]\s*(\d)").expect("Time separator regex pattern is valid and should compile"));
static SPACED_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*-+\s*").expect("Spaced dash regex pattern is valid and should compile"));
static SPACED_MERIDIEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)\s+([AP]M?)\b").expect("Spaced meridiem regex pattern is valid and should compile"));

static MERGED_COLON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[^\d:])(\d{3,5})([AP])").expect("Merged colon regex pattern is valid and should compile")
});

static JAMMED_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([AP]M?)\s*(\d)").expect("Jammed range regex pattern is valid and should compile"));

/// One side is 1-2 hour digits, an optional separator and 0-2 minute digits,
/// followed by an optional meridiem letter.
static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<s>\d{1,2}:?\d{0,2})(?:(?P<sm>[AP])M?\b)?-(?P<e>\d{1,2}:?\d{0,2})(?:(?P<em>[AP])M?\b)?")
        .expect("Time range regex pattern is valid and should compile")
});

/// Permissive pattern for "this looks like a time range", used for layout
/// scoring before any correction has been applied.
static LOOSE_TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9IO]{1,2}[:.]?[0-9IO]{0,2}\s*[APMS]{0,3}\s*[-–_]\s*[0-9IO]{1,2}[:.]?[0-9IO]{0,2}\s*[APMS]{0,3}")
        .expect("Loose time range regex pattern is valid and should compile")
});

#[inline]
fn chain_replacements<'a>(mut text: Cow<'a, str>, replacements: &[(&Regex, &str)]) -> Cow<'a, str> {
    for (pattern, replacement) in replacements {
        if pattern.is_match(&text) {
            text = Cow::Owned(pattern.replace_all(&text, *replacement).into_owned());
        }
    }
    text
}

/// Number of loose time-range substrings in `text`.
pub fn count_time_ranges(text: &str) -> usize {
    LOOSE_TIME_RANGE.find_iter(text).count()
}

/// First loose time-range substring in `text`.
pub fn first_time_range(text: &str) -> Option<&str> {
    LOOSE_TIME_RANGE.find(text).map(|m| m.as_str())
}

/// Whether the cell marks a day off or vacation.
pub fn is_off_marker(text: &str) -> bool {
    OFF_MARKER.is_match(&text.to_uppercase())
}

// ============================================================================
// Correction rules
// ============================================================================

/// `A.M.` / `P. M.` become `AM` / `PM`.
pub fn normalize_meridiem_dots(text: &str) -> Cow<'_, str> {
    MERIDIEM_DOTS.replace_all(text, "${1}M")
}

/// A `B` right after a bare 1-2 digit hour, and before a meridiem letter, a
/// range dash or the end of the text, is a lost `:00` (`10B-6P` → `10:00-6P`).
///
/// Any other `B` is left for [`substitute_confusables`].
pub fn repair_lost_zero_minutes(text: &str) -> Cow<'_, str> {
    if !text.contains('B') {
        return Cow::Borrowed(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);
    let mut changed = false;

    for (i, &c) in chars.iter().enumerate() {
        if c == 'B' && is_hour_before(&chars, i) && ends_time_side(&chars, i + 1) {
            out.push_str(":00");
            changed = true;
        } else {
            out.push(c);
        }
    }

    if changed { Cow::Owned(out) } else { Cow::Borrowed(text) }
}

fn is_hour_before(chars: &[char], index: usize) -> bool {
    let mut start = index;
    while start > 0 && chars[start - 1].is_ascii_digit() {
        start -= 1;
    }
    let run = index - start;
    (1..=2).contains(&run) && (start == 0 || chars[start - 1] != ':')
}

fn ends_time_side(chars: &[char], from: usize) -> bool {
    match chars[from..].iter().find(|c| !c.is_whitespace()) {
        None => true,
        Some(&next) => matches!(next, 'A' | 'P' | '-' | '_' | '–' | '—'),
    }
}

fn confusable_digit(c: char) -> Option<char> {
    match c {
        'O' | 'Q' | 'D' => Some('0'),
        'I' | 'L' | '!' | '|' => Some('1'),
        'B' => Some('8'),
        'S' => Some('5'),
        'Z' => Some('2'),
        _ => None,
    }
}

fn anchors_digit(c: Option<&char>) -> bool {
    matches!(c, Some(c) if c.is_ascii_digit() || *c == ':' || *c == '.')
}

/// Letters that look like digits become digits when they touch a digit or a
/// time separator. Applied until nothing changes, so runs such as `IO:OO`
/// resolve from the inside out.
pub fn substitute_confusables(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| confusable_digit(c).is_some()) {
        return Cow::Borrowed(text);
    }

    let mut chars: Vec<char> = text.chars().collect();
    let mut changed_any = false;

    loop {
        let snapshot = chars.clone();
        let mut changed = false;

        for i in 0..snapshot.len() {
            if let Some(digit) = confusable_digit(snapshot[i]) {
                let prev = if i > 0 { snapshot.get(i - 1) } else { None };
                let next = snapshot.get(i + 1);
                if anchors_digit(prev) || anchors_digit(next) {
                    chars[i] = digit;
                    changed = true;
                }
            }
        }

        if !changed {
            break;
        }
        changed_any = true;
    }

    if changed_any {
        Cow::Owned(chars.into_iter().collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Unify range dashes and time separators: underscores, en/em dashes and the
/// word `TO` become `-`; `.`, `;`, `,` between digits become `:`; spaces
/// around dashes and before meridiem letters are removed.
pub fn normalize_separators(text: &str) -> Cow<'_, str> {
    chain_replacements(
        Cow::Borrowed(text),
        &[
            (&DASH_LIKE, "-"),
            (&WORD_TO, "-"),
            (&DIGIT_PUNCT_DIGIT, "${1}:${2}"),
            (&SPACED_DASH, "-"),
            (&SPACED_MERIDIEM, "${1}${2}"),
        ],
    )
}

/// A 3-5 digit run glued to a meridiem letter lost its colon: `930P` →
/// `9:30P`, `1200P` → `12:00P`, `12100P` → `12:00P` (middle digit was the colon).
pub fn repair_merged_colon(text: &str) -> Cow<'_, str> {
    MERGED_COLON.replace_all(text, |caps: &Captures| {
        let digits = &caps[2];
        let repaired = match digits.len() {
            3 => format!("{}:{}", &digits[..1], &digits[1..]),
            4 => format!("{}:{}", &digits[..2], &digits[2..]),
            _ => format!("{}:{}", &digits[..2], &digits[3..]),
        };
        format!("{}{}{}", &caps[1], repaired, &caps[3])
    })
}

/// Two times glued together with no dash get one: `6:00P2:00A` → `6:00P-2:00A`.
pub fn repair_jammed_range(text: &str) -> Cow<'_, str> {
    JAMMED_RANGE.replace_all(text, "${1}-${2}")
}

/// When only one side of the first range carries a meridiem, give the other
/// side one.
///
/// The bare side inherits the marker unless that would make the range run
/// backwards on a 12-hour clock, in which case it takes the opposite marker:
/// `10-6P` reads as `10A-6P`, `5-9P` as `5P-9P`, `6P-2` as `6P-2A`.
pub fn infer_meridiem(text: &str) -> Cow<'_, str> {
    TIME_RANGE.replacen(text, 1, |caps: &Captures| {
        let start = &caps["s"];
        let end = &caps["e"];
        let whole = caps[0].to_string();

        match (caps.name("sm"), caps.name("em")) {
            (None, Some(em)) => {
                let marker = inferred_marker(hour12_of(start), hour12_of(end), em.as_str(), true);
                format!("{}{}-{}", start, marker, &whole[whole.find('-').map_or(0, |i| i + 1)..])
            }
            (Some(sm), None) => {
                let marker = inferred_marker(hour12_of(start), hour12_of(end), sm.as_str(), false);
                format!("{}{}", whole, marker)
            }
            _ => whole,
        }
    })
}

fn hour12_of(side: &str) -> Option<u32> {
    split_side(side).map(|(h, _)| h % 12)
}

fn opposite(marker: &str) -> &'static str {
    if marker == "A" { "P" } else { "A" }
}

fn inferred_marker(start: Option<u32>, end: Option<u32>, known: &str, known_is_end: bool) -> &'static str {
    let same: &'static str = if known == "A" { "A" } else { "P" };
    match (start, end) {
        (Some(s), Some(e)) => {
            let backwards = if known_is_end { s > e } else { e < s };
            if backwards { opposite(known) } else { same }
        }
        _ => same,
    }
}

/// Uppercase the cell and run every correction rule in order.
pub fn normalize_cell(text: &str) -> String {
    let mut text = text.trim().to_uppercase();
    for (_, rule) in CORRECTION_RULES {
        let changed = match rule(&text) {
            Cow::Owned(changed) => Some(changed),
            Cow::Borrowed(_) => None,
        };
        if let Some(changed) = changed {
            text = changed;
        }
    }
    text
}

// ============================================================================
// Extraction
// ============================================================================

fn split_side(side: &str) -> Option<(u32, u32)> {
    let (hour, minute) = match side.split_once(':') {
        Some((h, m)) => (h, m),
        None => match side.len() {
            0..=2 => (side, ""),
            3 => side.split_at(1),
            _ => side.split_at(2),
        },
    };

    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = match minute.len() {
        0 => 0,
        1 => minute.parse::<u32>().ok()? * 10,
        _ => minute.parse().ok()?,
    };
    Some((hour, minute))
}

/// Convert one side of a range to a 24-hour time.
///
/// An explicit meridiem converts 12-hour to 24-hour. Without one, hours
/// below `assume_pm_below_hour` are read as PM; everything else is taken as
/// a 24-hour value.
pub fn parse_side(side: &str, meridiem: Option<&str>, assume_pm_below_hour: Option<u32>) -> Option<NaiveTime> {
    let (hour, minute) = split_side(side)?;

    let hour = match meridiem {
        Some(marker) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (marker, hour) {
                ("A", 12) => 0,
                ("A", h) => h,
                (_, 12) => 12,
                (_, h) => h + 12,
            }
        }
        None => match assume_pm_below_hour {
            Some(cutoff) if (1..cutoff).contains(&hour) => hour + 12,
            _ => hour,
        },
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Extract the first `time-time` pair from an already normalized cell.
pub fn extract_range(normalized: &str, config: &TimeConfig) -> Option<TimeRange> {
    let caps = TIME_RANGE.captures(normalized)?;
    let start = parse_side(
        &caps["s"],
        caps.name("sm").map(|m| m.as_str()),
        config.assume_pm_below_hour,
    )?;
    let end = parse_side(
        &caps["e"],
        caps.name("em").map(|m| m.as_str()),
        config.assume_pm_below_hour,
    )?;
    Some(TimeRange::new(start, end))
}

fn meaningful_len(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

/// Parse one column's accumulated cell text.
///
/// # Example
///
/// ```rust
/// use rosterscan::core::config::TimeConfig;
/// use rosterscan::text::time::{parse_time_cell, ParseOutcome};
///
/// match parse_time_cell("6:00P2:00A", &TimeConfig::default()) {
///     ParseOutcome::Matched(range) => assert!(range.is_overnight()),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn parse_time_cell(text: &str, config: &TimeConfig) -> ParseOutcome {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParseOutcome::NoMatch;
    }
    if is_off_marker(trimmed) {
        return ParseOutcome::Off;
    }

    let normalized = normalize_cell(trimmed);
    if let Some(range) = extract_range(&normalized, config) {
        return ParseOutcome::Matched(range);
    }

    if meaningful_len(trimmed) > config.min_fallback_chars {
        ParseOutcome::Fallback(trimmed.to_string())
    } else {
        ParseOutcome::NoMatch
    }
}
