//! # Settings Loader
//!
//! Loads the profit tool settings from a JSON file. Every field is optional;
//! missing fields fall back to the eBay "Order earnings" report defaults
//! (header sentinel `Order creation date`, the eight preview columns, `$`).
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Explicit file
//! let settings = settings_loader::load_settings("settings.json")?;
//!
//! // Optional path: defaults when None
//! let path: Option<PathBuf> = None;
//! let settings = settings_loader::load_optional_settings(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::Settings;
use tracing::{debug, warn};

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Loads settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings = parse_settings(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    debug!(path = %path.display(), "loaded settings");
    Ok(settings)
}

pub fn parse_settings(raw: &str) -> Result<Settings> {
    let settings: Settings = serde_json::from_str(raw)?;
    Ok(settings)
}

/// Loads settings from an optional path, returning the defaults if no path is provided
pub fn load_optional_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(settings_path) => load_settings(settings_path),
        None => Ok(Settings::default()),
    }
}

/// Tries the provided path, then `settings.json` in the current directory,
/// then the built-in defaults.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Result<Settings> {
    if let Some(settings_path) = path {
        match load_settings(settings_path) {
            Ok(settings) => return Ok(settings),
            Err(e) => warn!("{:#}; falling back", e),
        }
    }

    if settings_file_exists(DEFAULT_SETTINGS_FILE) {
        return load_settings(DEFAULT_SETTINGS_FILE);
    }

    Ok(Settings::default())
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings = parse_settings(r#"{ "currency_symbol": "£", "xlsx_header_row": 2 }"#).unwrap();
        assert_eq!(settings.currency_symbol, "£");
        assert_eq!(settings.xlsx_header_row, 2);
        assert_eq!(settings.header_sentinel, "Order creation date");
        assert_eq!(settings.preview_columns.len(), 8);
    }

    #[test]
    fn test_custom_preview_columns() {
        let settings =
            parse_settings(r#"{ "preview_columns": ["Item ID", "Order earnings"] }"#).unwrap();
        assert_eq!(settings.preview_columns, vec!["Item ID", "Order earnings"]);
    }

    #[test]
    fn test_malformed_settings() {
        assert!(parse_settings("{ not json").is_err());
        assert!(parse_settings(r#"{ "xlsx_header_row": "two" }"#).is_err());
    }

    #[test]
    fn test_optional_none_gives_defaults() {
        let settings = load_optional_settings(None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = PathBuf::from("definitely/not/here/settings.json");
        assert!(load_optional_settings(Some(&path)).is_err());
    }
}
