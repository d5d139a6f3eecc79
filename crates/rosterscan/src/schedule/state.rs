//! Parse state threaded through the rows and pages of one document.
//!
//! Nothing here is global: every import owns its own [`DocumentState`], so
//! independent documents can be parsed concurrently without cross-talk.

use crate::layout::dates::{ColumnDates, DateToken, map_dates, virtual_anchor};
use crate::types::{ColumnSet, Row, Rotation};
use chrono::NaiveDate;

/// State that carries from one page to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentState {
    /// Rotation chosen on the first page, reused for every later page.
    pub rotation: Option<Rotation>,
    /// Explicit column dates from the latest page with a date row. Pages
    /// without one reuse them.
    pub column_dates: ColumnDates,
    /// Current section location; `None` means no location tag applies.
    pub location: Option<String>,
    /// Date used for year-less date tokens and the virtual anchor.
    pub reference_date: NaiveDate,
}

impl DocumentState {
    pub fn new(reference_date: NaiveDate, initial_location: Option<String>) -> Self {
        Self {
            rotation: None,
            column_dates: ColumnDates::new(),
            location: initial_location,
            reference_date,
        }
    }

    /// Monday of the reference date's week, used when no column is dated.
    pub fn anchor(&self) -> NaiveDate {
        virtual_anchor(self.reference_date)
    }

    pub fn has_column_dates(&self) -> bool {
        !self.column_dates.is_empty()
    }
}

/// State of the page currently being parsed.
///
/// The column set is written once, by the first header row, and never
/// replaced for the rest of the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageParseState {
    pub number: usize,
    columns: Option<ColumnSet>,
    /// Date row seen before the header, applied once the header appears.
    pending_dates: Option<Vec<DateToken>>,
    /// Set once a date row of this page has dated at least one column.
    dates_mapped: bool,
    /// Rows seen before any header; reported if the page never gets one.
    pub pre_header_rows: Vec<Row>,
}

impl PageParseState {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    pub fn columns(&self) -> Option<&ColumnSet> {
        self.columns.as_ref()
    }

    pub fn has_header(&self) -> bool {
        self.columns.is_some()
    }

    /// Establish the page's columns. Returns `false`, leaving the existing
    /// set untouched, when the page already has a header.
    pub fn establish_columns(&mut self, columns: ColumnSet) -> bool {
        if self.columns.is_some() {
            return false;
        }
        self.columns = Some(columns);
        true
    }

    pub fn buffer_dates(&mut self, tokens: Vec<DateToken>) {
        self.pending_dates = Some(tokens);
    }

    pub fn has_pending_dates(&self) -> bool {
        self.pending_dates.is_some()
    }

    pub fn dates_mapped(&self) -> bool {
        self.dates_mapped
    }

    /// True while a date row may still be read on this page.
    pub fn accepts_date_row(&self) -> bool {
        !self.dates_mapped && self.pending_dates.is_none()
    }

    /// Map date tokens onto this page's columns, replacing the dates carried
    /// over from earlier pages. Only the first date row of a page that binds
    /// a column counts. Returns the number of columns dated.
    pub fn apply_dates(&mut self, tokens: &[DateToken], document: &mut DocumentState, max_distance: f64) -> usize {
        let Some(columns) = &self.columns else {
            return 0;
        };
        if self.dates_mapped {
            return 0;
        }
        let mapped = map_dates(tokens, columns, max_distance);
        if mapped.is_empty() {
            return 0;
        }
        self.dates_mapped = true;
        document.column_dates = mapped;
        document.column_dates.len()
    }

    /// Apply a date row buffered before the header.
    pub fn apply_pending_dates(&mut self, document: &mut DocumentState, max_distance: f64) -> usize {
        match self.pending_dates.take() {
            Some(tokens) => self.apply_dates(&tokens, document, max_distance),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use chrono::Weekday;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn columns(xs: &[f64]) -> ColumnSet {
        ColumnSet::new(
            xs.iter()
                .map(|&x| Column {
                    x_center: x,
                    day: Weekday::Mon,
                })
                .collect(),
        )
    }

    #[test]
    fn test_document_anchor() {
        let doc = DocumentState::new(ymd(2025, 1, 9), Some("Plaza".to_string()));
        assert_eq!(doc.anchor(), ymd(2025, 1, 6));
        assert_eq!(doc.location.as_deref(), Some("Plaza"));
        assert!(!doc.has_column_dates());
    }

    #[test]
    fn test_first_header_wins() {
        let mut page = PageParseState::new(0);
        assert!(page.establish_columns(columns(&[100.0, 300.0, 500.0])));
        assert!(!page.establish_columns(columns(&[50.0, 60.0, 70.0])));
        assert_eq!(page.columns().unwrap().first_x(), Some(100.0));
    }

    #[test]
    fn test_pending_dates_applied_after_header() {
        let mut doc = DocumentState::new(ymd(2025, 1, 9), None);
        let mut page = PageParseState::new(0);
        page.buffer_dates(vec![
            DateToken { date: ymd(2025, 2, 3), x_center: 100.0 },
            DateToken { date: ymd(2025, 2, 4), x_center: 300.0 },
        ]);
        assert!(page.has_pending_dates());

        assert!(page.establish_columns(columns(&[100.0, 300.0])));
        assert_eq!(page.apply_pending_dates(&mut doc, 150.0), 2);
        assert!(!page.has_pending_dates());
        assert_eq!(doc.column_dates[&1], ymd(2025, 2, 4));
    }

    #[test]
    fn test_dates_mapped_once_per_page() {
        let mut doc = DocumentState::new(ymd(2025, 1, 9), None);
        let mut page = PageParseState::new(0);
        page.establish_columns(columns(&[100.0]));

        let first = [DateToken { date: ymd(2025, 2, 3), x_center: 100.0 }];
        let second = [DateToken { date: ymd(2025, 3, 3), x_center: 100.0 }];
        assert_eq!(page.apply_dates(&first, &mut doc, 150.0), 1);
        assert!(page.dates_mapped());
        assert!(!page.accepts_date_row());
        assert_eq!(page.apply_dates(&second, &mut doc, 150.0), 0);
        assert_eq!(doc.column_dates[&0], ymd(2025, 2, 3));
    }

    #[test]
    fn test_new_page_date_row_replaces_carried_dates() {
        let mut doc = DocumentState::new(ymd(2025, 1, 9), None);

        let mut first = PageParseState::new(0);
        first.establish_columns(columns(&[100.0, 300.0]));
        first.apply_dates(&[DateToken { date: ymd(2025, 1, 13), x_center: 100.0 }], &mut doc, 150.0);

        let mut second = PageParseState::new(1);
        second.establish_columns(columns(&[100.0, 300.0]));
        assert!(second.accepts_date_row());
        let tokens = [DateToken { date: ymd(2025, 1, 20), x_center: 100.0 }];
        assert_eq!(second.apply_dates(&tokens, &mut doc, 150.0), 1);
        assert_eq!(doc.column_dates[&0], ymd(2025, 1, 20));
    }

    #[test]
    fn test_unbound_date_row_keeps_carried_dates() {
        let mut doc = DocumentState::new(ymd(2025, 1, 9), None);
        doc.column_dates.insert(0, ymd(2025, 1, 13));

        let mut page = PageParseState::new(1);
        page.establish_columns(columns(&[100.0]));
        let far = [DateToken { date: ymd(2025, 1, 20), x_center: 900.0 }];
        assert_eq!(page.apply_dates(&far, &mut doc, 150.0), 0);
        assert!(!page.dates_mapped());
        assert_eq!(doc.column_dates[&0], ymd(2025, 1, 13));
    }
}
