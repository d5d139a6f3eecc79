//! Error types for rosterscan.
//!
//! Only collaborator failures (OCR engine, employee directory, shift store) and
//! configuration problems are errors. Noisy cells, unmatched names, and pages
//! without a header are *outcomes*, reported through
//! [`ImportReport`](crate::types::ImportReport) rather than through this type.
//!
//! # Error Handling Philosophy
//!
//! **System errors MUST always bubble up unchanged:**
//! - `RosterError::Io` (from `std::io::Error`) - file system errors, permission errors
//!
//! **Application errors are wrapped with context:**
//! - `Ocr` - the OCR engine failed for a page or rotation
//! - `Storage` - the shift store rejected a read or write
//! - `Directory` - the employee directory lookup failed
//! - `Validation` - invalid configuration or parameters
//!
//! # Example
//!
//! ```rust
//! use rosterscan::{RosterError, Result};
//!
//! fn load_fragments(path: &str) -> Result<String> {
//!     // IO errors bubble up automatically via ?
//!     let content = std::fs::read_to_string(path)?;
//!
//!     if content.trim().is_empty() {
//!         return Err(RosterError::validation(format!("Fragment file is empty: {}", path)));
//!     }
//!
//!     Ok(content)
//! }
//! ```
use thiserror::Error;

/// Result type alias using `RosterError`.
pub type Result<T> = std::result::Result<T, RosterError>;

/// Main error type for all rosterscan operations.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Directory error: {message}")]
    Directory {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        RosterError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl RosterError {
    error_constructor!(ocr, Ocr);
    error_constructor!(validation, Validation);
    error_constructor!(storage, Storage);
    error_constructor!(directory, Directory);
    error_constructor!(serialization, Serialization);

    /// Whether this error came from the shift store.
    ///
    /// The pipeline stops materializing on storage errors and reports them as
    /// a database outcome instead of a per-page error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}
