use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

// ============================================================================
// Geometry
// ============================================================================

/// A point in page-pixel space.
///
/// Serialized as a two-element array `[x, y]`, the shape OCR engines emit for
/// bounding-box corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// One OCR-recognized text span with its bounding box and confidence.
///
/// The bounding box is four corner points, clockwise from the top-left. Engines
/// that detect skewed text emit non-axis-aligned quads, so all extents are taken
/// as min/max over the four corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub bbox: [Point; 4],
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
}

impl TextFragment {
    pub fn new(bbox: [Point; 4], text: impl Into<String>, confidence: f64) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence,
        }
    }

    /// Build an axis-aligned fragment from its left/top/right/bottom edges.
    pub fn from_rect(left: f64, top: f64, right: f64, bottom: f64, text: impl Into<String>) -> Self {
        Self::new(
            [
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, bottom),
                Point::new(left, bottom),
            ],
            text,
            1.0,
        )
    }

    pub fn left(&self) -> f64 {
        self.bbox.iter().map(|p| p.x).fold(f64::INFINITY, f64::min)
    }

    pub fn right(&self) -> f64 {
        self.bbox.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn top(&self) -> f64 {
        self.bbox.iter().map(|p| p.y).fold(f64::INFINITY, f64::min)
    }

    pub fn bottom(&self) -> f64 {
        self.bbox.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn width(&self) -> f64 {
        self.right() - self.left()
    }

    pub fn x_center(&self) -> f64 {
        (self.left() + self.right()) / 2.0
    }

    pub fn y_center(&self) -> f64 {
        (self.top() + self.bottom()) / 2.0
    }
}

/// Fragments whose vertical centers fall within the row tolerance, ordered
/// left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub fragments: Vec<TextFragment>,
}

impl Row {
    pub fn new(fragments: Vec<TextFragment>) -> Self {
        Self { fragments }
    }

    /// Full row text, fragments joined by single spaces.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whitespace-separated tokens across all fragments, in order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().flat_map(|f| f.text.split_whitespace())
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }
}

// ============================================================================
// Columns
// ============================================================================

/// A day-of-week slot defined by a horizontal position on the header row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub x_center: f64,
    pub day: Weekday,
}

/// The active columns of a page, sorted ascending by x-center.
///
/// There is no way to mutate a `ColumnSet` once built; a page keeps the first
/// one it establishes.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSet {
    columns: Vec<Column>,
}

impl ColumnSet {
    pub fn new(mut columns: Vec<Column>) -> Self {
        columns.sort_by(|a, b| a.x_center.total_cmp(&b.x_center));
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn first_x(&self) -> Option<f64> {
        self.columns.first().map(|c| c.x_center)
    }

    /// Average distance between adjacent column centers, or `fallback` when
    /// fewer than two columns exist.
    pub fn average_gap(&self, fallback: f64) -> f64 {
        match (self.columns.first(), self.columns.last()) {
            (Some(first), Some(last)) if self.columns.len() > 1 => {
                (last.x_center - first.x_center) / (self.columns.len() - 1) as f64
            }
            _ => fallback,
        }
    }

    /// Index of the column closest to `x` and its distance.
    pub fn nearest(&self, x: f64) -> Option<(usize, f64)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, c)| (i, (x - c.x_center).abs()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

// ============================================================================
// Pages and orientation
// ============================================================================

/// Page rotation hypotheses, evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270];

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        Rotation::from_degrees(value).ok_or_else(|| format!("Invalid rotation: {}° (expected 0, 90, 180 or 270)", value))
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// One page of a document as handed to the OCR engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageImage {
    /// Zero-based position of the page in its document.
    pub number: usize,
    /// Encoded image bytes (PNG, JPEG, TIFF, ...). Backends that work from
    /// precomputed results may leave this empty.
    pub bytes: Vec<u8>,
}

impl PageImage {
    pub fn new(number: usize, bytes: Vec<u8>) -> Self {
        Self { number, bytes }
    }

    /// A page with no image payload, for backends keyed by page number.
    pub fn placeholder(number: usize) -> Self {
        Self {
            number,
            bytes: Vec::new(),
        }
    }
}

// ============================================================================
// Shifts
// ============================================================================

/// A parsed start/end time-of-day pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// An overnight range ends on the calendar day after it starts.
    pub fn is_overnight(&self) -> bool {
        self.end < self.start
    }
}

/// An employee identity as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub default_role_id: Option<i64>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// The structured output unit of the pipeline.
///
/// Each candidate comes from exactly one row and one column of one page, which
/// `page`, `row` and `column` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftCandidate {
    pub employee_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
    /// Original cell text when no time range could be parsed. Such candidates
    /// carry placeholder times and need manual review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    pub page: usize,
    pub row: usize,
    pub column: usize,
}

impl ShiftCandidate {
    pub fn needs_review(&self) -> bool {
        self.raw_text.is_some()
    }

    pub fn is_overnight(&self) -> bool {
        self.end_time < self.start_time
    }

    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn end(&self) -> NaiveDateTime {
        let end_date = if self.is_overnight() {
            self.date + Duration::days(1)
        } else {
            self.date
        };
        end_date.and_time(self.end_time)
    }
}

// ============================================================================
// Import run
// ============================================================================

/// Caller-selected options for one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Collect candidates into the report instead of storing them.
    pub dry_run: bool,
    /// Date used for the virtual Monday anchor and for date tokens without a
    /// year. Defaults to today's local date.
    pub reference_date: Option<NaiveDate>,
}

/// How the run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportStatus {
    Completed,
    /// The shift store failed; materialization stopped at that point.
    DatabaseError { message: String },
}

/// A name that did not resolve to an employee, with the shifts parsed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedEmployee {
    pub name: String,
    pub shifts: Vec<ShiftCandidate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// The page never established a header row.
    NoColumns,
    /// The row carried shift cells but no name to attribute them to.
    MissingName,
}

/// A row that could not be attributed, kept for manual reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedRow {
    pub page: usize,
    pub text: String,
    pub reason: UnmatchedReason,
}

/// Result of [`import_document`](crate::core::pipeline::import_document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    #[serde(flatten)]
    pub status: ImportStatus,
    pub imported_count: usize,
    /// Every candidate produced by the run; only populated for dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_shifts: Option<Vec<ShiftCandidate>>,
    pub unmatched_employees: Vec<UnmatchedEmployee>,
    pub unmatched_rows: Vec<UnmatchedRow>,
    /// Candidates discarded because the employee already had a shift that day.
    pub skipped_duplicates: usize,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
}

impl ImportReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            status: ImportStatus::Completed,
            imported_count: 0,
            parsed_shifts: dry_run.then(Vec::new),
            unmatched_employees: Vec::new(),
            unmatched_rows: Vec::new(),
            skipped_duplicates: 0,
            errors: Vec::new(),
            rotation: None,
        }
    }

    pub fn is_database_error(&self) -> bool {
        matches!(self.status, ImportStatus::DatabaseError { .. })
    }

    /// Record shifts for an unmatched name, grouping by name.
    pub fn add_unmatched_shifts(&mut self, name: &str, shifts: Vec<ShiftCandidate>) {
        if let Some(entry) = self.unmatched_employees.iter_mut().find(|e| e.name == name) {
            entry.shifts.extend(shifts);
        } else {
            self.unmatched_employees.push(UnmatchedEmployee {
                name: name.to_string(),
                shifts,
            });
        }
    }
}
