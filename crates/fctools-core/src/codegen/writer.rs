//! Extensible constants writing traits.
//!
//! This module provides the [`EnumWriter`] trait for customizing
//! how the generated constants file is written.

use std::fmt::Result;

/// Trait for writing the pieces of a generated constants file.
///
/// [`emit`](super::emit) drives a writer through the header, then one
/// [`write_enum`](EnumWriter::write_enum) call per category in
/// lexicographic order, then the embedded server configuration.
pub trait EnumWriter {
    /// Write the fixed, hand-authored header block
    fn write_header(&mut self, header: &str) -> Result {
        let _ = header;
        Ok(())
    }

    /// Write one enumeration; `entries` are already in ascending value order
    fn write_enum(&mut self, category: &str, entries: &[(&str, i64)]) -> Result {
        let _ = (category, entries);
        Ok(())
    }

    /// Write the pretty-printed server configuration
    fn write_server_config(&mut self, json: &str) -> Result {
        let _ = json;
        Ok(())
    }
}

/// A writer that collects statistics about the generated file
#[derive(Debug, Default)]
pub struct StatsWriter {
    /// Number of generated enumerations
    pub enum_count: usize,
    /// Number of entries across all generated enumerations
    pub entry_count: usize,
    /// Number of entries with a negative (seeded) value
    pub negative_count: usize,
    /// Size of the embedded configuration in bytes
    pub config_bytes: usize,
}

impl EnumWriter for StatsWriter {
    fn write_enum(&mut self, _category: &str, entries: &[(&str, i64)]) -> Result {
        self.enum_count += 1;
        self.entry_count += entries.len();
        self.negative_count += entries.iter().filter(|(_, v)| *v < 0).count();
        Ok(())
    }

    fn write_server_config(&mut self, json: &str) -> Result {
        self.config_bytes = json.len();
        Ok(())
    }
}
