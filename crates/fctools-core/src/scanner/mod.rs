//! Script scanning module for finding protocol constant definitions.
//!
//! The client script assigns its protocol constants as properties of a
//! couple of namespace objects, one per line or chained with `;`/`,`:
//!
//! ```text
//! FCS.FCTYPE_LOGIN = 1;
//! w.FCVIDEO_TX_IDLE = 0;
//! ```
//!
//! The property name is split on its first underscore into a category
//! (`FCTYPE`) and a name within that category (`LOGIN`).
//!
//! ## Extensibility
//!
//! The [`ScanStrategy`] trait allows custom scanning algorithms:
//!
//! ```no_run
//! use fctools_core::scanner::{ConstantEntry, ScanStrategy};
//! use fctools_core::Result;
//!
//! struct CustomScanner;
//!
//! impl ScanStrategy for CustomScanner {
//!     fn scan(&self, text: &str) -> Result<Vec<ConstantEntry>> {
//!         // Custom scanning logic
//!         Ok(vec![])
//!     }
//! }
//! ```

use crate::error::{Error, Result};
use regex::Regex;
use tracing::{debug, trace};

/// Namespace objects the client script hangs its constants off
pub const DEFAULT_NAMESPACES: &[&str] = &["FCS", "w"];

/// A single `CATEGORY_NAME = value` definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantEntry {
    /// Category, e.g. `FCTYPE`
    pub category: String,
    /// Name within the category, e.g. `LOGIN`
    pub name: String,
    /// Numeric value
    pub value: i64,
}

impl ConstantEntry {
    /// Creates a new constant entry
    pub fn new(category: impl Into<String>, name: impl Into<String>, value: i64) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            value,
        }
    }
}

/// Configuration for the scanner
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Namespace identifiers whose properties are treated as constants
    pub namespaces: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            namespaces: DEFAULT_NAMESPACES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the recognized namespace identifiers
    pub fn namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }
}

/// Trait for implementing custom scanning strategies
pub trait ScanStrategy: Send + Sync {
    /// Scan the provided script text for constant definitions, in the
    /// order they appear
    fn scan(&self, text: &str) -> Result<Vec<ConstantEntry>>;
}

/// Primary scanner for constant assignments in script text
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScannerConfig,
    pattern: Regex,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Creates a new scanner with default configuration
    pub fn new() -> Self {
        Self::with_config(ScannerConfig::default())
            .expect("default namespaces always form a valid pattern")
    }

    /// Creates a new scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Result<Self> {
        let pattern = Regex::new(&build_pattern(&config.namespaces))?;
        Ok(Self { config, pattern })
    }

    /// Returns the scanner's configuration
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }
}

impl ScanStrategy for Scanner {
    fn scan(&self, text: &str) -> Result<Vec<ConstantEntry>> {
        let mut results = Vec::new();

        debug!("Starting scan of {} bytes", text.len());

        for caps in self.pattern.captures_iter(text) {
            // Group 1 is the leading separator and group 2 the namespace;
            // neither takes part in naming the constant.
            let category = &caps[3];
            let name = &caps[4];
            let raw = &caps[5];

            // Leading zeros are normalised away. A value past i64 aborts the
            // whole run instead of dropping the constant.
            let value = raw.parse::<i64>().map_err(|_| Error::ConstantOutOfRange {
                category: category.to_string(),
                name: name.to_string(),
                raw: raw.to_string(),
            })?;

            trace!("Found {}_{} = {}", category, name, value);
            results.push(ConstantEntry::new(category, name, value));
        }

        debug!("Scan complete: found {} constants", results.len());
        Ok(results)
    }
}

/// Build the assignment pattern for the given namespaces
fn build_pattern(namespaces: &[String]) -> String {
    let alternatives = namespaces
        .iter()
        .map(|ns| regex::escape(ns))
        .collect::<Vec<_>>()
        .join("|");

    format!(r"(\s|;?|,)({alternatives})\.([A-Z0-9]+)_([A-Z0-9_]+)\s+?=\s+?([0-9]+);")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<ConstantEntry> {
        Scanner::new().scan(text).unwrap()
    }

    #[test]
    fn test_scanner_config_builder() {
        let config = ScannerConfig::new().namespaces(["NS"]);
        assert_eq!(config.namespaces, vec!["NS".to_string()]);

        let scanner = Scanner::with_config(config).unwrap();
        assert_eq!(scanner.config().namespaces, vec!["NS".to_string()]);
    }

    #[test]
    fn test_empty_input() {
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_no_constants() {
        assert!(scan("var a = 1; function f() { return FCS.x; }").is_empty());
    }

    #[test]
    fn test_both_namespaces_and_separators() {
        let text = "FCS.FCTYPE_LOGIN = 1;\nw.FCVIDEO_TX_IDLE = 0;w.FCVIDEO_RX_IDLE = 90;,FCS.EVUP_FULL = 2;";
        let found = scan(text);

        assert_eq!(
            found,
            vec![
                ConstantEntry::new("FCTYPE", "LOGIN", 1),
                ConstantEntry::new("FCVIDEO", "TX_IDLE", 0),
                ConstantEntry::new("FCVIDEO", "RX_IDLE", 90),
                ConstantEntry::new("EVUP", "FULL", 2),
            ]
        );
    }

    #[test]
    fn test_category_splits_on_first_underscore() {
        let found = scan(" FCS.FCTYPE_CLIENT_MANUAL_DISCONNECT = 77;");
        assert_eq!(found, vec![ConstantEntry::new("FCTYPE", "CLIENT_MANUAL_DISCONNECT", 77)]);
    }

    #[test]
    fn test_requires_whitespace_around_equals() {
        assert!(scan("FCS.FCTYPE_LOGIN=1;").is_empty());
        assert_eq!(scan("FCS.FCTYPE_LOGIN  =  1;").len(), 1);
    }

    #[test]
    fn test_ignores_other_namespaces_and_non_numeric_values() {
        assert!(scan("other.FCTYPE_LOGIN = 1;").is_empty());
        assert!(scan("FCS.FCTYPE_LOGIN = x;").is_empty());
        assert!(scan("FCS.FCTYPE_LOGIN = -1;").is_empty());
        assert!(scan("FCS.fctype_login = 1;").is_empty());
    }

    #[test]
    fn test_custom_namespaces_are_escaped() {
        let scanner = Scanner::with_config(ScannerConfig::new().namespaces(["a.b"])).unwrap();
        let found = scanner.scan("a.b.FOO_BAR = 3; axb.FOO_BAZ = 4;").unwrap();
        assert_eq!(found, vec![ConstantEntry::new("FOO", "BAR", 3)]);
    }

    #[test]
    fn test_leading_zeros_are_normalised() {
        assert_eq!(scan("FCS.EVUP_FULL = 007;"), vec![ConstantEntry::new("EVUP", "FULL", 7)]);
    }

    #[test]
    fn test_out_of_range_value() {
        let err = Scanner::new()
            .scan("FCS.BIG_NUM = 99999999999999999999999;")
            .unwrap_err();
        assert!(matches!(err, Error::ConstantOutOfRange { .. }));
    }
}
