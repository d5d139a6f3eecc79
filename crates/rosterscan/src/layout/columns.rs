//! Row classification: name tokens on the left, cell text per column.

use crate::core::config::LayoutConfig;
use crate::text::time::first_time_range;
use crate::types::{ColumnSet, Row, TextFragment};
use std::collections::BTreeMap;

/// A data row split into its name and per-column cell text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedRow {
    pub name: String,
    pub cells: BTreeMap<usize, String>,
}

impl ClassifiedRow {
    pub fn has_cells(&self) -> bool {
        self.cells.values().any(|cell| !cell.trim().is_empty())
    }
}

fn trim_name(name: &str) -> String {
    name.trim()
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .trim()
        .to_string()
}

/// Divide `items` into `parts` contiguous slices of proportional size.
fn proportional_slices<T>(items: &[T], parts: usize) -> impl Iterator<Item = &[T]> {
    let len = items.len();
    (0..parts).map(move |i| &items[i * len / parts..(i + 1) * len / parts])
}

/// Text pieces of a fragment that spans several columns, one per column.
fn split_wide_fragment(text: &str, covered: &[usize]) -> Vec<(usize, String)> {
    let words: Vec<&str> = text.split_whitespace().collect();

    if words.len() >= covered.len() {
        return covered
            .iter()
            .zip(proportional_slices(&words, covered.len()))
            .map(|(&column, slice)| (column, slice.join(" ")))
            .collect();
    }

    let chars: Vec<char> = text.chars().collect();
    covered
        .iter()
        .zip(proportional_slices(&chars, covered.len()))
        .filter_map(|(&column, slice)| {
            let piece: String = slice.iter().collect();
            match first_time_range(&piece) {
                Some(range) => Some((column, range.trim().to_string())),
                None => {
                    tracing::debug!("Discarding residue '{}' of a wide fragment", piece);
                    None
                }
            }
        })
        .collect()
}

/// Columns whose centers fall within the fragment's span padded by half a gap.
fn covered_columns(fragment: &TextFragment, columns: &ColumnSet, gap: f64) -> Vec<usize> {
    let low = fragment.left() - gap / 2.0;
    let high = fragment.right() + gap / 2.0;
    columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.x_center >= low && c.x_center <= high)
        .map(|(i, _)| i)
        .collect()
}

/// Separate a row into its name and the text of each column.
///
/// Fragments left of the first column (less the name margin) form the name.
/// A fragment wider than `wide_block_factor` column gaps has its text shared
/// among the columns it covers; any other fragment goes to its nearest column
/// when closer than `nearest_column_factor` gaps, and is dropped otherwise.
pub fn classify_row(row: &Row, columns: &ColumnSet, layout: &LayoutConfig) -> ClassifiedRow {
    let Some(first_x) = columns.first_x() else {
        return ClassifiedRow {
            name: trim_name(&row.text()),
            cells: BTreeMap::new(),
        };
    };

    let gap = columns.average_gap(layout.default_column_gap_px);
    let name_limit = first_x - layout.name_margin_px;

    let mut name_tokens: Vec<&str> = Vec::new();
    let mut pieces: BTreeMap<usize, Vec<String>> = BTreeMap::new();

    for fragment in &row.fragments {
        let text = fragment.text.trim();
        if text.is_empty() {
            continue;
        }

        if fragment.x_center() < name_limit {
            name_tokens.push(text);
            continue;
        }

        if fragment.width() > layout.wide_block_factor * gap {
            let covered = covered_columns(fragment, columns, gap);
            if covered.len() > 1 {
                for (column, piece) in split_wide_fragment(text, &covered) {
                    if !piece.is_empty() {
                        pieces.entry(column).or_default().push(piece);
                    }
                }
                continue;
            }
            let target = covered.first().copied().or_else(|| columns.nearest(fragment.x_center()).map(|(i, _)| i));
            if let Some(column) = target {
                pieces.entry(column).or_default().push(text.to_string());
            }
            continue;
        }

        match columns.nearest(fragment.x_center()) {
            Some((column, distance)) if distance < layout.nearest_column_factor * gap => {
                pieces.entry(column).or_default().push(text.to_string());
            }
            _ => tracing::debug!(
                "Dropping fragment '{}' at x={:.0}: no column within {:.0}px",
                text,
                fragment.x_center(),
                layout.nearest_column_factor * gap
            ),
        }
    }

    ClassifiedRow {
        name: trim_name(&name_tokens.join(" ")),
        cells: pieces.into_iter().map(|(column, texts)| (column, texts.join(" "))).collect(),
    }
}
