//! Row-by-row classification of one page.
//!
//! Rows are processed strictly top to bottom. Each row is first checked for a
//! section header, which only updates the current location, and is then
//! classified as the page header, a date row, or a data row.

use crate::core::config::ImportConfig;
use crate::layout::columns::{ClassifiedRow, classify_row};
use crate::layout::dates::detect_date_row;
use crate::layout::header::locate_header;
use crate::schedule::state::{DocumentState, PageParseState};
use crate::text::location::LocationMatcher;
use crate::types::{Row, UnmatchedReason, UnmatchedRow};

/// A data row ready for materialization.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    /// Position of the row on its page, after line reconstruction.
    pub index: usize,
    pub name: String,
    pub cells: Vec<(usize, String)>,
    /// Section location in effect when the row was read.
    pub location: Option<String>,
}

/// Everything one page contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    pub number: usize,
    pub rows: Vec<DataRow>,
    pub unmatched_rows: Vec<UnmatchedRow>,
}

/// Classify the rows of one page, updating the document state as section
/// headers and the page's date row are met.
pub fn parse_page(
    number: usize,
    rows: &[Row],
    document: &mut DocumentState,
    matcher: &LocationMatcher,
    config: &ImportConfig,
) -> ParsedPage {
    let layout = &config.layout;
    let mut state = PageParseState::new(number);
    let mut parsed = ParsedPage {
        number,
        ..ParsedPage::default()
    };

    for (index, row) in rows.iter().enumerate() {
        let text = row.text();
        if text.is_empty() {
            continue;
        }

        let section = matcher.detect_section(&text);
        if let Some(section) = &section {
            tracing::debug!("Page {} row {}: section '{}' -> {:?}", number, index, section.token, section.location);
            document.location = section.location.clone();
        }

        if !state.has_header() {
            if let Some(columns) = locate_header(row, layout.min_header_days) {
                tracing::debug!("Page {} row {}: header with {} columns", number, index, columns.len());
                state.establish_columns(columns);
                let dated = state.apply_pending_dates(document, layout.date_max_distance_px);
                if dated > 0 {
                    tracing::debug!("Page {}: applied buffered date row to {} columns", number, dated);
                }
                continue;
            }
            if state.accepts_date_row()
                && let Some(tokens) = detect_date_row(row, document.reference_date, layout.min_date_tokens)
            {
                tracing::debug!("Page {} row {}: buffering date row before header", number, index);
                state.buffer_dates(tokens);
                continue;
            }
            if section.is_none() {
                state.pre_header_rows.push(row.clone());
            }
            continue;
        }

        if locate_header(row, layout.min_header_days).is_some() {
            tracing::debug!("Page {} row {}: ignoring repeated header '{}'", number, index, text);
            continue;
        }

        if !state.dates_mapped()
            && let Some(tokens) = detect_date_row(row, document.reference_date, layout.min_date_tokens)
        {
            let dated = state.apply_dates(&tokens, document, layout.date_max_distance_px);
            tracing::debug!("Page {} row {}: date row dated {} columns", number, index, dated);
            continue;
        }

        let Some(columns) = state.columns() else {
            continue;
        };
        let ClassifiedRow { name, cells } = classify_row(row, columns, layout);
        let has_cells = cells.values().any(|c| !c.trim().is_empty());

        if !has_cells {
            if section.is_none() && !name.is_empty() {
                tracing::debug!("Page {} row {}: no cells for '{}'", number, index, name);
            }
            continue;
        }

        if name.is_empty() {
            parsed.unmatched_rows.push(UnmatchedRow {
                page: number,
                text,
                reason: UnmatchedReason::MissingName,
            });
            continue;
        }

        parsed.rows.push(DataRow {
            index,
            name,
            cells: cells.into_iter().collect(),
            location: document.location.clone(),
        });
    }

    if !state.has_header() {
        tracing::info!(
            "Page {}: no header row found, reporting {} rows as unmatched",
            number,
            state.pre_header_rows.len()
        );
        parsed.unmatched_rows.extend(state.pre_header_rows.iter().map(|row| UnmatchedRow {
            page: number,
            text: row.text(),
            reason: UnmatchedReason::NoColumns,
        }));
    } else if !state.pre_header_rows.is_empty() {
        tracing::debug!("Page {}: skipped {} rows above the header", number, state.pre_header_rows.len());
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextFragment;
    use chrono::NaiveDate;

    fn frag(x: f64, y: f64, text: &str) -> TextFragment {
        TextFragment::from_rect(x - 30.0, y - 10.0, x + 30.0, y + 10.0, text)
    }

    fn row(y: f64, cells: &[(f64, &str)]) -> Row {
        Row::new(cells.iter().map(|(x, t)| frag(*x, y, t)).collect())
    }

    fn header(y: f64) -> Row {
        row(y, &[(100.0, "MON"), (300.0, "TUE"), (500.0, "WED")])
    }

    fn setup() -> (DocumentState, LocationMatcher, ImportConfig) {
        let config = ImportConfig::default();
        let matcher = LocationMatcher::new(&config.locations).unwrap();
        let doc = DocumentState::new(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(), None);
        (doc, matcher, config)
    }

    #[test]
    fn test_header_then_data() {
        let (mut doc, matcher, config) = setup();
        let rows = vec![
            header(100.0),
            row(200.0, &[(10.0, "Eve"), (100.0, "9:00A-5:00P"), (300.0, "OFF"), (500.0, "10B-6:00P")]),
        ];

        let parsed = parse_page(0, &rows, &mut doc, &matcher, &config);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].name, "Eve");
        assert_eq!(parsed.rows[0].index, 1);
        assert_eq!(parsed.rows[0].cells.len(), 3);
        assert!(parsed.unmatched_rows.is_empty());
    }

    #[test]
    fn test_sections_tag_following_rows() {
        let (mut doc, matcher, config) = setup();
        let rows = vec![
            header(100.0),
            row(150.0, &[(10.0, "PLAZA")]),
            row(200.0, &[(10.0, "Eve"), (100.0, "9A-5P")]),
            row(250.0, &[(10.0, "CASHIER")]),
            row(300.0, &[(10.0, "Bob"), (300.0, "9A-5P")]),
        ];

        let parsed = parse_page(0, &rows, &mut doc, &matcher, &config);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].location.as_deref(), Some("Plaza"));
        assert_eq!(parsed.rows[1].location, None);
        assert_eq!(doc.location, None);
    }

    #[test]
    fn test_date_row_before_header_is_buffered() {
        let (mut doc, matcher, config) = setup();
        let rows = vec![
            row(50.0, &[(100.0, "2/3"), (300.0, "2/4"), (500.0, "2/5")]),
            header(100.0),
            row(200.0, &[(10.0, "Eve"), (100.0, "9A-5P")]),
        ];

        let parsed = parse_page(0, &rows, &mut doc, &matcher, &config);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(doc.column_dates.len(), 3);
        assert_eq!(doc.column_dates[&0], NaiveDate::from_ymd_opt(2025, 2, 3).unwrap());
    }

    #[test]
    fn test_date_row_after_header() {
        let (mut doc, matcher, config) = setup();
        let rows = vec![
            header(100.0),
            row(130.0, &[(100.0, "1/13/25"), (300.0, "1/14/25"), (500.0, "1/15/25")]),
            row(200.0, &[(10.0, "Eve"), (100.0, "9A-5P")]),
        ];

        let parsed = parse_page(0, &rows, &mut doc, &matcher, &config);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(doc.column_dates[&2], NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    }

    #[test]
    fn test_second_page_reads_its_own_date_row() {
        let (mut doc, matcher, config) = setup();
        let first = vec![
            header(100.0),
            row(130.0, &[(100.0, "1/13/25"), (300.0, "1/14/25"), (500.0, "1/15/25")]),
            row(200.0, &[(10.0, "Eve"), (100.0, "9A-5P")]),
        ];
        let second = vec![
            header(100.0),
            row(130.0, &[(100.0, "1/20/25"), (300.0, "1/21/25"), (500.0, "1/22/25")]),
            row(200.0, &[(10.0, "Bob"), (100.0, "9A-5P")]),
        ];

        parse_page(0, &first, &mut doc, &matcher, &config);
        let parsed = parse_page(1, &second, &mut doc, &matcher, &config);
        assert_eq!(parsed.rows.len(), 1);
        assert!(parsed.unmatched_rows.is_empty(), "date row is not a nameless data row");
        assert_eq!(doc.column_dates[&0], NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());
    }

    #[test]
    fn test_repeated_header_ignored() {
        let (mut doc, matcher, config) = setup();
        let rows = vec![
            header(100.0),
            row(200.0, &[(10.0, "Eve"), (100.0, "9A-5P")]),
            row(300.0, &[(10.0, "MON"), (150.0, "TUE"), (250.0, "WED")]),
            row(400.0, &[(10.0, "Bob"), (500.0, "9A-5P")]),
        ];

        let parsed = parse_page(0, &rows, &mut doc, &matcher, &config);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].cells, vec![(2, "9A-5P".to_string())]);
    }

    #[test]
    fn test_page_without_header_reports_rows() {
        let (mut doc, matcher, config) = setup();
        let rows = vec![
            row(100.0, &[(10.0, "Weekly roster")]),
            row(200.0, &[(10.0, "Eve"), (100.0, "9A-5P")]),
        ];

        let parsed = parse_page(3, &rows, &mut doc, &matcher, &config);
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.unmatched_rows.len(), 2);
        assert!(parsed.unmatched_rows.iter().all(|r| r.reason == UnmatchedReason::NoColumns && r.page == 3));
        assert_eq!(parsed.unmatched_rows[1].text, "Eve 9A-5P");
    }

    #[test]
    fn test_cells_without_name() {
        let (mut doc, matcher, config) = setup();
        let rows = vec![header(100.0), row(200.0, &[(100.0, "9A-5P"), (300.0, "9A-5P")])];

        let parsed = parse_page(0, &rows, &mut doc, &matcher, &config);
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.unmatched_rows.len(), 1);
        assert_eq!(parsed.unmatched_rows[0].reason, UnmatchedReason::MissingName);
    }
}
