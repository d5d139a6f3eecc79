//! Configuration loading and management.
//!
//! All geometric thresholds, time-parsing policy, the location vocabulary and
//! OCR call limits live in [`ImportConfig`]. It can be loaded from TOML, YAML
//! or JSON, discovered from a `rosterscan.toml` in the directory hierarchy, or
//! built programmatically.

use crate::{Result, RosterError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the configuration file picked up by [`ImportConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "rosterscan.toml";

/// Main import configuration.
///
/// # Example
///
/// ```rust
/// use rosterscan::core::config::ImportConfig;
///
/// let mut config = ImportConfig::default();
/// config.time.assume_pm_below_hour = None;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub time: TimeConfig,

    #[serde(default)]
    pub locations: LocationConfig,

    #[serde(default)]
    pub ocr: OcrConfig,
}

/// Geometric thresholds, in page pixels unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Vertical distance at which a fragment starts a new row.
    #[serde(default = "default_row_tolerance")]
    pub row_tolerance_px: f64,

    /// Fragments centered further left than `first column - margin` are name tokens.
    #[serde(default = "default_name_margin")]
    pub name_margin_px: f64,

    /// Distinct day names needed for a row to become the header.
    #[serde(default = "default_min_tokens")]
    pub min_header_days: usize,

    /// Repaired date tokens needed for a row to become the date row.
    #[serde(default = "default_min_tokens")]
    pub min_date_tokens: usize,

    /// Date tokens further than this from every column are discarded.
    #[serde(default = "default_date_max_distance")]
    pub date_max_distance_px: f64,

    /// Fragments wider than `factor * average column gap` span several columns.
    #[serde(default = "default_wide_block_factor")]
    pub wide_block_factor: f64,

    /// Fragments further than `factor * average column gap` from every column are dropped.
    #[serde(default = "default_nearest_column_factor")]
    pub nearest_column_factor: f64,

    /// Column gap assumed when only one column exists.
    #[serde(default = "default_column_gap")]
    pub default_column_gap_px: f64,
}

/// Time-of-day parsing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Hours below this value with no AM/PM marker are read as PM.
    ///
    /// The source schedules rarely start before 7 in the morning without an
    /// explicit marker. `None` reads unmarked hours as 24-hour clock values.
    #[serde(default = "default_pm_cutoff")]
    pub assume_pm_below_hour: Option<u32>,

    /// Placeholder start hour for raw-text fallback shifts.
    #[serde(default = "default_fallback_start")]
    pub fallback_start_hour: u32,

    /// Placeholder end hour for raw-text fallback shifts.
    #[serde(default = "default_fallback_end")]
    pub fallback_end_hour: u32,

    /// Cleaned cell text must be longer than this to be kept as a fallback.
    #[serde(default = "default_min_fallback_chars")]
    pub min_fallback_chars: usize,
}

/// Location vocabulary used for section headers and in-cell overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Canonical location tokens, matched case-insensitively.
    #[serde(default = "default_known_locations")]
    pub known: Vec<String>,

    /// Tokens whose section means "no location tag applies".
    #[serde(default = "default_untagged_locations")]
    pub untagged: Vec<String>,

    /// Location in effect before the first section header.
    #[serde(default)]
    pub initial: Option<String>,

    /// Synonyms mapping to a canonical location name.
    #[serde(default = "default_location_aliases")]
    pub aliases: BTreeMap<String, String>,
}

/// Limits for calls into the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Per-invocation timeout.
    #[serde(default = "default_ocr_timeout")]
    pub timeout_secs: u64,

    /// Attempts per page/rotation before the call counts as failed.
    #[serde(default = "default_ocr_attempts")]
    pub max_attempts: u32,
}

fn default_row_tolerance() -> f64 {
    35.0
}
fn default_name_margin() -> f64 {
    50.0
}
fn default_min_tokens() -> usize {
    3
}
fn default_date_max_distance() -> f64 {
    150.0
}
fn default_wide_block_factor() -> f64 {
    1.2
}
fn default_nearest_column_factor() -> f64 {
    0.6
}
fn default_column_gap() -> f64 {
    200.0
}
fn default_pm_cutoff() -> Option<u32> {
    Some(7)
}
fn default_fallback_start() -> u32 {
    9
}
fn default_fallback_end() -> u32 {
    17
}
fn default_min_fallback_chars() -> usize {
    3
}
fn default_ocr_timeout() -> u64 {
    60
}
fn default_ocr_attempts() -> u32 {
    2
}

fn default_known_locations() -> Vec<String> {
    [
        "LOT 1",
        "LOT 2",
        "LOT 3",
        "LOT 4",
        "PLAZA",
        "CONRAC",
        "OFFICE",
        "MAINTENANCE",
        "SUPERVISORS",
        "CUSTOMER LOTS",
        "CASHIER",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_location_aliases() -> BTreeMap<String, String> {
    [
        ("SUP3", "Supervisors"),
        ("FLOAT", "Office"),
        ("OFF: MGD", "Office"),
        ("RECPTAR", "Office"),
        ("ADIAU", "Office"),
        ("ADMIN", "Office"),
        ("AFM", "Office"),
        ("AD", "Office"),
        ("SUP-MGR", "Maintenance"),
        ("C-LOT", "Customer Lots"),
        ("CLOT", "Customer Lots"),
        ("CUSTOMER LOT", "Customer Lots"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_untagged_locations() -> Vec<String> {
    vec!["CASHIER".to_string()]
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_tolerance_px: default_row_tolerance(),
            name_margin_px: default_name_margin(),
            min_header_days: default_min_tokens(),
            min_date_tokens: default_min_tokens(),
            date_max_distance_px: default_date_max_distance(),
            wide_block_factor: default_wide_block_factor(),
            nearest_column_factor: default_nearest_column_factor(),
            default_column_gap_px: default_column_gap(),
        }
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            assume_pm_below_hour: default_pm_cutoff(),
            fallback_start_hour: default_fallback_start(),
            fallback_end_hour: default_fallback_end(),
            min_fallback_chars: default_min_fallback_chars(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            known: default_known_locations(),
            untagged: default_untagged_locations(),
            initial: None,
            aliases: default_location_aliases(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_ocr_timeout(),
            max_attempts: default_ocr_attempts(),
        }
    }
}

impl ImportConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| RosterError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| RosterError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| RosterError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("toml") => Self::from_toml_file(path),
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(RosterError::validation(format!(
                "Unsupported config format: {} (expected .toml, .yaml, .yml or .json)",
                path.display()
            ))),
        }
    }

    /// Discover `rosterscan.toml` in the current directory or its parents.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let current = std::env::current_dir().map_err(RosterError::Io)?;
        Self::discover_from(&current)
    }

    /// Like [`discover`](Self::discover), starting from `start`.
    pub fn discover_from(start: &Path) -> Result<Option<Self>> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Reject thresholds and hours that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        let positive = [
            ("layout.row_tolerance_px", layout.row_tolerance_px),
            ("layout.name_margin_px", layout.name_margin_px),
            ("layout.date_max_distance_px", layout.date_max_distance_px),
            ("layout.wide_block_factor", layout.wide_block_factor),
            ("layout.nearest_column_factor", layout.nearest_column_factor),
            ("layout.default_column_gap_px", layout.default_column_gap_px),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RosterError::validation(format!("{} must be positive, got {}", name, value)));
            }
        }

        if layout.min_header_days == 0 || layout.min_header_days > 7 {
            return Err(RosterError::validation(format!(
                "layout.min_header_days must be between 1 and 7, got {}",
                layout.min_header_days
            )));
        }
        if layout.min_date_tokens == 0 {
            return Err(RosterError::validation("layout.min_date_tokens must be at least 1"));
        }

        let time = &self.time;
        if let Some(cutoff) = time.assume_pm_below_hour
            && cutoff > 12
        {
            return Err(RosterError::validation(format!(
                "time.assume_pm_below_hour must be at most 12, got {}",
                cutoff
            )));
        }
        if time.fallback_start_hour > 23 || time.fallback_end_hour > 23 {
            return Err(RosterError::validation(format!(
                "fallback hours must be within 0..=23, got {}..{}",
                time.fallback_start_hour, time.fallback_end_hour
            )));
        }

        if self.ocr.max_attempts == 0 {
            return Err(RosterError::validation("ocr.max_attempts must be at least 1"));
        }
        if self.ocr.timeout_secs == 0 {
            return Err(RosterError::validation("ocr.timeout_secs must be at least 1"));
        }

        Ok(())
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| RosterError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ImportConfig::default();
        assert_eq!(config.layout.row_tolerance_px, 35.0);
        assert_eq!(config.layout.date_max_distance_px, 150.0);
        assert_eq!(config.time.assume_pm_below_hour, Some(7));
        assert!(config.locations.known.iter().any(|l| l == "CONRAC"));
        assert_eq!(config.locations.aliases.get("C-LOT").map(String::as_str), Some("Customer Lots"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file_partial() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("rosterscan.toml");

        fs::write(
            &config_path,
            r#"
[layout]
row_tolerance_px = 28.0

[time]
assume_pm_below_hour = 6
"#,
        )
        .unwrap();

        let config = ImportConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(config.layout.row_tolerance_px, 28.0);
        assert_eq!(config.layout.name_margin_px, 50.0);
        assert_eq!(config.time.assume_pm_below_hour, Some(6));
        assert_eq!(config.ocr.max_attempts, 2);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("rosterscan.yaml");

        fs::write(
            &config_path,
            r#"
locations:
  known: ["GATE A"]
  untagged: []
  initial: "Plaza"
"#,
        )
        .unwrap();

        let config = ImportConfig::from_file(&config_path).unwrap();
        assert_eq!(config.locations.known, vec!["GATE A".to_string()]);
        assert!(config.locations.untagged.is_empty());
        assert_eq!(config.locations.initial.as_deref(), Some("Plaza"));
        assert!(!config.locations.aliases.is_empty());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("rosterscan.json");
        fs::write(&config_path, r#"{"ocr": {"timeout_secs": 5}}"#).unwrap();

        let config = ImportConfig::from_file(&config_path).unwrap();
        assert_eq!(config.ocr.timeout_secs, 5);
    }

    #[test]
    fn test_invalid_toml_is_validation_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("rosterscan.toml");
        fs::write(&config_path, "[layout\nrow_tolerance_px = ").unwrap();

        let err = ImportConfig::from_toml_file(&config_path).unwrap_err();
        assert!(matches!(err, RosterError::Validation { .. }));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = ImportConfig::from_file("settings.ini").unwrap_err();
        assert!(err.to_string().contains("Unsupported config format"));
    }

    #[test]
    fn test_discover_walks_parents() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[ocr]\nmax_attempts = 4\n").unwrap();

        let config = ImportConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.ocr.max_attempts, 4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ImportConfig::default();
        config.layout.row_tolerance_px = 0.0;
        assert!(config.validate().is_err());

        let mut config = ImportConfig::default();
        config.time.assume_pm_below_hour = Some(13);
        assert!(config.validate().is_err());

        let mut config = ImportConfig::default();
        config.ocr.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ImportConfig::default();
        config.layout.min_header_days = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = ImportConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: ImportConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
