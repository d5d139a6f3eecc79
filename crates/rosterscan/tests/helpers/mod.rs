//! Shared fixtures for the integration tests: fragment builders, a scripted
//! OCR backend, and failing collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rosterscan::plugins::{EmployeeDirectory, OcrBackend, Plugin, ShiftStore};
use rosterscan::types::{Employee, PageImage, Rotation, ShiftCandidate, TextFragment};
use rosterscan::{ImportOptions, Result, RosterError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Column centers of a full Monday..Sunday header.
pub const COLUMN_X: [f64; 7] = [100.0, 300.0, 500.0, 700.0, 900.0, 1100.0, 1300.0];
pub const DAY_LABELS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// A 60x20 fragment centered on (x, y).
pub fn frag(x: f64, y: f64, text: &str) -> TextFragment {
    TextFragment::from_rect(x - 30.0, y - 10.0, x + 30.0, y + 10.0, text)
}

/// Header naming the first `days` weekdays.
pub fn header(y: f64, days: usize) -> Vec<TextFragment> {
    (0..days).map(|i| frag(COLUMN_X[i], y, DAY_LABELS[i])).collect()
}

/// A lone text line at the left margin.
pub fn line(y: f64, text: &str) -> Vec<TextFragment> {
    vec![frag(10.0, y, text)]
}

/// A data row: the name left of the columns, then one fragment per cell.
pub fn data_row(y: f64, name: &str, cells: &[(usize, &str)]) -> Vec<TextFragment> {
    let mut fragments = vec![frag(10.0, y, name)];
    fragments.extend(cells.iter().map(|(column, text)| frag(COLUMN_X[*column], y, text)));
    fragments
}

pub fn page(parts: Vec<Vec<TextFragment>>) -> Vec<TextFragment> {
    parts.into_iter().flatten().collect()
}

pub fn employees() -> Vec<Employee> {
    vec![
        Employee {
            id: 1,
            first_name: "Eve".to_string(),
            last_name: "Adams".to_string(),
            default_role_id: Some(10),
        },
        Employee {
            id: 2,
            first_name: "Bob".to_string(),
            last_name: "Stone".to_string(),
            default_role_id: Some(20),
        },
    ]
}

/// Options for a run anchored on the week of Monday 2025-01-06.
pub fn options(dry_run: bool) -> ImportOptions {
    ImportOptions {
        dry_run,
        reference_date: Some(ymd(2025, 1, 8)),
    }
}

/// OCR backend answering from a script of (page, rotation) outputs.
///
/// Unscripted calls fail with an OCR error. Every request is recorded.
#[derive(Default)]
pub struct ScriptedOcr {
    outputs: HashMap<(usize, Rotation), Vec<TextFragment>>,
    delays: HashMap<usize, Duration>,
    pub requests: Mutex<Vec<(usize, Rotation)>>,
    pub call_count: AtomicUsize,
}

impl ScriptedOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, page: usize, rotation: Rotation, fragments: Vec<TextFragment>) -> Self {
        self.outputs.insert((page, rotation), fragments);
        self
    }

    /// Upright page: real fragments at 0°, nothing readable elsewhere.
    pub fn with_upright(self, page: usize, fragments: Vec<TextFragment>) -> Self {
        self.with(page, Rotation::Deg0, fragments)
            .with(page, Rotation::Deg90, Vec::new())
            .with(page, Rotation::Deg180, Vec::new())
            .with(page, Rotation::Deg270, Vec::new())
    }

    pub fn with_delay(mut self, page: usize, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    pub fn requests_for(&self, page: usize) -> Vec<Rotation> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == page)
            .map(|(_, r)| *r)
            .collect()
    }
}

impl Plugin for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted-ocr"
    }

    fn version(&self) -> String {
        "1.0.0".to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl OcrBackend for ScriptedOcr {
    async fn recognize(&self, page: &PageImage, rotation: Rotation) -> Result<Vec<TextFragment>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((page.number, rotation));

        if let Some(delay) = self.delays.get(&page.number) {
            tokio::time::sleep(*delay).await;
        }

        self.outputs
            .get(&(page.number, rotation))
            .cloned()
            .ok_or_else(|| RosterError::ocr(format!("engine crashed on page {} at {}", page.number, rotation)))
    }
}

/// Shift store that accepts `accept` inserts and then fails every write.
pub struct FailingStore {
    accept: usize,
    pub inserts: AtomicUsize,
}

impl FailingStore {
    pub fn after(accept: usize) -> Self {
        Self {
            accept,
            inserts: AtomicUsize::new(0),
        }
    }
}

impl Plugin for FailingStore {
    fn name(&self) -> &str {
        "failing-store"
    }

    fn version(&self) -> String {
        "1.0.0".to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ShiftStore for FailingStore {
    async fn has_shift_on(&self, _employee_id: i64, _date: NaiveDate) -> Result<bool> {
        Ok(false)
    }

    async fn insert_shift(&self, _employee: &Employee, _shift: &ShiftCandidate) -> Result<()> {
        if self.inserts.load(Ordering::SeqCst) >= self.accept {
            return Err(RosterError::storage("commit failed: database is locked"));
        }
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Directory whose every lookup fails.
pub struct UnreachableDirectory;

impl Plugin for UnreachableDirectory {
    fn name(&self) -> &str {
        "unreachable-directory"
    }

    fn version(&self) -> String {
        "1.0.0".to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl EmployeeDirectory for UnreachableDirectory {
    async fn lookup(&self, _name: &str) -> Result<Option<Employee>> {
        Err(RosterError::directory("connection refused"))
    }
}
