//! Employee directory collaborator.

use crate::Result;
use crate::plugins::Plugin;
use crate::types::Employee;
use async_trait::async_trait;

/// Resolves a parsed name fragment to at most one employee.
#[async_trait]
pub trait EmployeeDirectory: Plugin {
    /// Look up the employee a schedule row's name refers to.
    ///
    /// Returns `Ok(None)` when nobody matches; that row's shifts are then
    /// reported as unmatched rather than dropped.
    ///
    /// # Errors
    ///
    /// - `RosterError::Directory` - the lookup itself failed
    async fn lookup(&self, name: &str) -> Result<Option<Employee>>;
}
