//! Base plugin trait definition.
//!
//! Every external collaborator of the import pipeline (OCR engine, employee
//! directory, shift store) implements `Plugin` for identification and
//! lifecycle management.

use crate::Result;

/// Base trait that all collaborators must implement.
///
/// # Thread Safety
///
/// Collaborators must be `Send + Sync` so independent documents can be
/// imported concurrently against the same backends.
///
/// # Example
///
/// ```rust
/// use rosterscan::plugins::Plugin;
/// use rosterscan::Result;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct ScannerBridge {
///     connected: AtomicBool,
/// }
///
/// impl Plugin for ScannerBridge {
///     fn name(&self) -> &str {
///         "scanner-bridge"
///     }
///
///     fn version(&self) -> String {
///         "1.0.0".to_string()
///     }
///
///     fn initialize(&self) -> Result<()> {
///         self.connected.store(true, Ordering::Release);
///         Ok(())
///     }
///
///     fn shutdown(&self) -> Result<()> {
///         self.connected.store(false, Ordering::Release);
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Unique, lowercase, hyphenated identifier (e.g. `"precomputed-ocr"`).
    fn name(&self) -> &str;

    /// Semantic version of this plugin.
    fn version(&self) -> String;

    /// Acquire resources (load models, open connections).
    fn initialize(&self) -> Result<()>;

    /// Release resources. Should be idempotent.
    fn shutdown(&self) -> Result<()>;

    fn description(&self) -> &str {
        ""
    }
}
