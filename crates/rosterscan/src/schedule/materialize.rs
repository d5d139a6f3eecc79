//! Turning classified rows into shift candidates and storing them.

use crate::Result;
use crate::core::config::{ImportConfig, TimeConfig};
use crate::layout::dates::{ColumnDates, resolve_column_date};
use crate::plugins::{EmployeeDirectory, ShiftStore};
use crate::schedule::page::{DataRow, ParsedPage};
use crate::schedule::state::DocumentState;
use crate::text::location::LocationMatcher;
use crate::text::time::{ParseOutcome, parse_time_cell};
use crate::types::{Employee, ImportReport, ShiftCandidate};
use ahash::AHashSet;
use chrono::{NaiveDate, NaiveTime};

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h.min(23), 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Shift candidates of one data row, before employee resolution.
///
/// A location named inside a cell overrides the row's section location for
/// that cell; a cell holding only a location yields nothing. Cells marked off
/// or without any usable text yield nothing either.
pub fn row_candidates(
    row: &DataRow,
    page: usize,
    dates: &ColumnDates,
    anchor: NaiveDate,
    matcher: &LocationMatcher,
    time: &TimeConfig,
) -> Vec<ShiftCandidate> {
    let mut candidates = Vec::new();

    for (column, text) in &row.cells {
        let split = matcher.split_cell(text);
        if split.is_pure_location() {
            continue;
        }
        let location = match split.section {
            Some(section) => section.location,
            None => row.location.clone(),
        };

        let (start_time, end_time, raw_text) = match parse_time_cell(&split.remainder, time) {
            ParseOutcome::Matched(range) => (range.start, range.end, None),
            ParseOutcome::Fallback(raw) => {
                tracing::debug!("Keeping unparsed cell '{}' of '{}' for review", raw, row.name);
                (hour(time.fallback_start_hour), hour(time.fallback_end_hour), Some(text.trim().to_string()))
            }
            ParseOutcome::Off => continue,
            ParseOutcome::NoMatch => {
                tracing::debug!("Ignoring trivial cell '{}' of '{}'", text, row.name);
                continue;
            }
        };

        let Some(date) = resolve_column_date(dates, *column, anchor) else {
            tracing::warn!("Column {} of page {} has no representable date", column, page);
            continue;
        };

        candidates.push(ShiftCandidate {
            employee_name: row.name.clone(),
            employee_id: None,
            role_id: None,
            date,
            start_time,
            end_time,
            location,
            raw_text,
            page,
            row: row.index,
            column: *column,
        });
    }

    candidates
}

/// Resolves employees, filters duplicates, and stores or previews shifts.
///
/// The set of `(employee, date)` pairs already claimed during the run is kept
/// alongside the store's own answer, so dry runs see their earlier candidates
/// too.
pub struct Materializer<'a> {
    directory: &'a dyn EmployeeDirectory,
    store: &'a dyn ShiftStore,
    matcher: &'a LocationMatcher,
    config: &'a ImportConfig,
    dry_run: bool,
    claimed: AHashSet<(i64, NaiveDate)>,
}

impl<'a> Materializer<'a> {
    pub fn new(
        directory: &'a dyn EmployeeDirectory,
        store: &'a dyn ShiftStore,
        matcher: &'a LocationMatcher,
        config: &'a ImportConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            directory,
            store,
            matcher,
            config,
            dry_run,
            claimed: AHashSet::new(),
        }
    }

    /// Whether `employee` may get a new shift on `date`.
    async fn claim(&mut self, employee: &Employee, date: NaiveDate) -> Result<bool> {
        if self.claimed.contains(&(employee.id, date)) {
            return Ok(false);
        }
        if self.store.has_shift_on(employee.id, date).await? {
            return Ok(false);
        }
        self.claimed.insert((employee.id, date));
        Ok(true)
    }

    /// Materialize every data row of a page into `report`.
    ///
    /// # Errors
    ///
    /// Any shift store failure. The caller reports it as a database error and
    /// stops the run; everything stored before it stays stored.
    pub async fn materialize_page(
        &mut self,
        page: &ParsedPage,
        document: &DocumentState,
        report: &mut ImportReport,
    ) -> Result<()> {
        let anchor = document.anchor();
        if !document.has_column_dates() && !page.rows.is_empty() {
            tracing::debug!("Page {}: no dated columns, counting days from {}", page.number, anchor);
        }

        for row in &page.rows {
            let candidates = row_candidates(
                row,
                page.number,
                &document.column_dates,
                anchor,
                self.matcher,
                &self.config.time,
            );
            if candidates.is_empty() {
                continue;
            }

            let employee = match self.directory.lookup(&row.name).await {
                Ok(employee) => employee,
                Err(e) => {
                    tracing::warn!("Employee lookup failed for '{}': {}", row.name, e);
                    report.errors.push(format!("Employee lookup failed for '{}': {}", row.name, e));
                    None
                }
            };

            let Some(employee) = employee else {
                tracing::debug!("No employee matches '{}', keeping {} shifts", row.name, candidates.len());
                report.add_unmatched_shifts(&row.name, candidates);
                continue;
            };

            for mut candidate in candidates {
                candidate.employee_id = Some(employee.id);
                candidate.role_id = employee.default_role_id;

                if !self.claim(&employee, candidate.date).await? {
                    tracing::debug!(
                        "Skipping shift for {} on {}: already scheduled",
                        employee.full_name(),
                        candidate.date
                    );
                    report.skipped_duplicates += 1;
                    continue;
                }

                if self.dry_run {
                    if let Some(parsed) = report.parsed_shifts.as_mut() {
                        parsed.push(candidate);
                    }
                } else {
                    self.store.insert_shift(&employee, &candidate).await?;
                    report.imported_count += 1;
                }
            }
        }

        Ok(())
    }
}
