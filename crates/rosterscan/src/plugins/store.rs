//! Shift persistence collaborator.

use crate::Result;
use crate::plugins::Plugin;
use crate::types::{Employee, ShiftCandidate};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Durable shift storage.
///
/// Writes must be visible to `has_shift_on` as soon as `insert_shift`
/// returns: later rows of the same import rely on it for duplicate checks.
#[async_trait]
pub trait ShiftStore: Plugin {
    /// Whether `employee_id` already has any shift starting on `date`.
    async fn has_shift_on(&self, employee_id: i64, date: NaiveDate) -> Result<bool>;

    /// Persist `shift` for `employee`.
    ///
    /// # Errors
    ///
    /// - `RosterError::Storage` - the write failed; the pipeline stops
    ///   materializing and reports a database error
    async fn insert_shift(&self, employee: &Employee, shift: &ShiftCandidate) -> Result<()>;
}
