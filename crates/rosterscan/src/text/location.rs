//! Location vocabulary matching for section headers and in-cell overrides.
//!
//! All known tokens and aliases are compiled into one case-insensitive
//! alternation, longest token first, so that among overlapping candidates the
//! most specific one (`CUSTOMER LOTS` over `CUSTOMER LOT`) wins explicitly
//! instead of depending on list order.

use crate::core::config::LocationConfig;
use crate::{Result, RosterError};
use ahash::AHashMap;
use regex::{Regex, RegexBuilder};

/// Rows shorter than this may match a location loosely (ignoring punctuation).
const LOOSE_SECTION_MAX_CHARS: usize = 25;
/// Rows shorter than this may match a location as a whole word.
const WORD_SECTION_MAX_CHARS: usize = 40;
/// Shortest compacted token a longer row may contain in the loose rule.
const MIN_CONTAINED_TOKEN_LEN: usize = 4;
/// Shortest compacted row a longer token may contain in the loose rule.
const MIN_CONTAINED_ROW_LEN: usize = 4;

/// A recognized location token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMatch {
    /// The vocabulary entry that matched, uppercased.
    pub token: String,
    /// The canonical location, or `None` for sections exempt from tagging.
    pub location: Option<String>,
}

/// A cell with its location override, if any, split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSplit {
    pub section: Option<SectionMatch>,
    /// The rest of the cell, trimmed.
    pub remainder: String,
}

impl CellSplit {
    /// Whether the cell held nothing but a location token.
    pub fn is_pure_location(&self) -> bool {
        self.section.is_some() && !self.remainder.chars().any(char::is_alphanumeric)
    }
}

/// A whole-word location hit inside a longer text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationHit {
    pub section: SectionMatch,
    pub start: usize,
    pub end: usize,
}

/// Precompiled location matcher.
#[derive(Debug, Clone)]
pub struct LocationMatcher {
    pattern: Option<Regex>,
    resolutions: AHashMap<String, Option<String>>,
    /// (alphanumeric-only key, uppercase token), longest key first.
    compact: Vec<(String, String)>,
}

fn title_case(token: &str) -> String {
    token
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

fn normalize_token(token: &str) -> String {
    token.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

impl LocationMatcher {
    pub fn new(config: &LocationConfig) -> Result<Self> {
        let mut resolutions: AHashMap<String, Option<String>> = AHashMap::new();

        for token in &config.known {
            let key = normalize_token(token);
            if !key.is_empty() {
                resolutions.insert(key, Some(title_case(token)));
            }
        }
        for (alias, canonical) in &config.aliases {
            let key = normalize_token(alias);
            if !key.is_empty() {
                resolutions.insert(key, Some(canonical.clone()));
            }
        }
        for token in &config.untagged {
            let key = normalize_token(token);
            if !key.is_empty() {
                resolutions.insert(key, None);
            }
        }

        let mut tokens: Vec<String> = resolutions.keys().cloned().collect();
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if tokens.is_empty() {
            None
        } else {
            let alternation = tokens
                .iter()
                .map(|t| regex::escape(t).replace(' ', r"\s+"))
                .collect::<Vec<_>>()
                .join("|");
            let regex = RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
                .case_insensitive(true)
                .build()
                .map_err(|e| RosterError::validation_with_source("Invalid location vocabulary", e))?;
            Some(regex)
        };

        let mut compact_keys: Vec<(String, String)> = tokens
            .iter()
            .map(|t| (compact(t), t.clone()))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        compact_keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.1.cmp(&b.1)));

        Ok(Self {
            pattern,
            resolutions,
            compact: compact_keys,
        })
    }

    fn section_for(&self, token: &str) -> Option<SectionMatch> {
        let key = normalize_token(token);
        self.resolutions.get(&key).map(|location| SectionMatch {
            token: key,
            location: location.clone(),
        })
    }

    /// Longest whole-word location token in `text` that is not immediately
    /// followed by a time separator (`:` or `.`).
    pub fn find(&self, text: &str) -> Option<LocationHit> {
        let pattern = self.pattern.as_ref()?;

        pattern
            .find_iter(text)
            .filter(|m| {
                !text[m.end()..]
                    .trim_start()
                    .starts_with(|c: char| c == ':' || c == '.')
            })
            .fold(None::<regex::Match<'_>>, |best, m| match best {
                Some(b) if b.as_str().len() >= m.as_str().len() => Some(b),
                _ => Some(m),
            })
            .and_then(|m| {
                self.section_for(m.as_str()).map(|section| LocationHit {
                    section,
                    start: m.start(),
                    end: m.end(),
                })
            })
    }

    /// Decide whether a whole row is a section header.
    ///
    /// A short row (< 25 chars) matches when, ignoring everything but letters
    /// and digits, it equals a token, contains one, or is contained by one. A
    /// moderately short row (< 40 chars) matches when a token appears as a
    /// whole word not followed by a time separator.
    pub fn detect_section(&self, row_text: &str) -> Option<SectionMatch> {
        let trimmed = row_text.trim();
        let len = trimmed.chars().count();
        if len == 0 {
            return None;
        }

        if len < LOOSE_SECTION_MAX_CHARS {
            let row_key = compact(trimmed);
            if !row_key.is_empty() {
                let hit = self.compact.iter().find(|(key, _)| {
                    *key == row_key
                        || (key.len() >= MIN_CONTAINED_TOKEN_LEN && row_key.contains(key.as_str()))
                        || (row_key.len() >= MIN_CONTAINED_ROW_LEN && key.contains(row_key.as_str()))
                });
                if let Some((_, token)) = hit {
                    return self.section_for(token);
                }
            }
        }

        if len < WORD_SECTION_MAX_CHARS {
            return self.find(trimmed).map(|hit| hit.section);
        }

        None
    }

    /// Split a location override off a cell.
    pub fn split_cell(&self, cell: &str) -> CellSplit {
        match self.find(cell) {
            Some(hit) => {
                let mut remainder = String::with_capacity(cell.len());
                remainder.push_str(&cell[..hit.start]);
                remainder.push(' ');
                remainder.push_str(&cell[hit.end..]);
                CellSplit {
                    section: Some(hit.section),
                    remainder: remainder.trim().to_string(),
                }
            }
            None => CellSplit {
                section: None,
                remainder: cell.trim().to_string(),
            },
        }
    }
}
