//! In-memory employee directory and shift store.
//!
//! Both are file-backed through JSON so the CLI can run imports without a
//! database, and both are what the integration tests run against.

use crate::plugins::{EmployeeDirectory, Plugin, ShiftStore};
use crate::types::{Employee, ShiftCandidate};
use crate::{Result, RosterError};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn name_tokens(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Employee directory over a fixed list.
///
/// A name matches on its first token against first names; when several
/// employees share that first name, a later token contained in (or
/// containing) the last name picks between them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    employees: Vec<Employee>,
}

impl InMemoryDirectory {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self { employees }
    }

    /// Load a JSON array of employees.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let employees: Vec<Employee> = serde_json::from_str(&content).map_err(|e| {
            RosterError::directory_with_source(format!("Invalid employee file {}", path.as_ref().display()), e)
        })?;
        Ok(Self::new(employees))
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    fn find(&self, name: &str) -> Option<&Employee> {
        let tokens = name_tokens(name);
        let (first, rest) = tokens.split_first()?;

        let candidates: Vec<&Employee> = self
            .employees
            .iter()
            .filter(|e| e.first_name.to_lowercase() == *first)
            .collect();

        if candidates.len() > 1 {
            let by_last_name = candidates.iter().copied().find(|e| {
                let last = e.last_name.to_lowercase();
                !last.is_empty()
                    && rest
                        .iter()
                        .any(|t| last.contains(t.as_str()) || t.contains(last.as_str()))
            });
            if by_last_name.is_some() {
                return by_last_name;
            }
        }

        candidates.first().copied()
    }
}

impl Plugin for InMemoryDirectory {
    fn name(&self) -> &str {
        "in-memory-directory"
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryDirectory {
    async fn lookup(&self, name: &str) -> Result<Option<Employee>> {
        Ok(self.find(name).cloned())
    }
}

/// Where a stored shift came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftSource {
    #[default]
    Manual,
    Import,
}

/// A persisted shift record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredShift {
    pub employee_id: i64,
    #[serde(default)]
    pub role_id: Option<i64>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub location: Option<String>,
    /// Raw cell text kept for shifts that need review.
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source: ShiftSource,
}

impl StoredShift {
    pub fn from_candidate(employee: &Employee, shift: &ShiftCandidate) -> Self {
        Self {
            employee_id: employee.id,
            role_id: shift.role_id.or(employee.default_role_id),
            start: shift.start(),
            end: shift.end(),
            location: shift.location.clone(),
            notes: shift.raw_text.clone(),
            source: ShiftSource::Import,
        }
    }
}

/// Shift store holding everything in memory.
///
/// Inserts are visible to `has_shift_on` immediately.
#[derive(Debug, Default)]
pub struct InMemoryShiftStore {
    shifts: RwLock<Vec<StoredShift>>,
}

impl InMemoryShiftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shifts(shifts: Vec<StoredShift>) -> Self {
        Self {
            shifts: RwLock::new(shifts),
        }
    }

    /// Load a JSON array of shifts; a missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let shifts: Vec<StoredShift> = serde_json::from_str(&content)
            .map_err(|e| RosterError::storage_with_source(format!("Invalid shift file {}", path.display()), e))?;
        Ok(Self::with_shifts(shifts))
    }

    /// Write all shifts as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&*self.shifts.read())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn push(&self, shift: StoredShift) {
        self.shifts.write().push(shift);
    }

    pub fn shifts(&self) -> Vec<StoredShift> {
        self.shifts.read().clone()
    }

    pub fn len(&self) -> usize {
        self.shifts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.read().is_empty()
    }
}

impl Plugin for InMemoryShiftStore {
    fn name(&self) -> &str {
        "in-memory-shift-store"
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ShiftStore for InMemoryShiftStore {
    async fn has_shift_on(&self, employee_id: i64, date: NaiveDate) -> Result<bool> {
        Ok(self
            .shifts
            .read()
            .iter()
            .any(|s| s.employee_id == employee_id && s.start.date() == date))
    }

    async fn insert_shift(&self, employee: &Employee, shift: &ShiftCandidate) -> Result<()> {
        self.push(StoredShift::from_candidate(employee, shift));
        Ok(())
    }
}
