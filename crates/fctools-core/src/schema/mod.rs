//! Packet log schema inference module.
//!
//! The packet inspector appends one line per received packet to its log:
//!
//! ```text
//! [2017/06/30 - 21:04:17, PACKETLOG.TXT] {"FCType":"LOGIN","nFrom":0,...,"sMessage":"guest"}
//! ```
//!
//! [`SchemaInferencer`] drops the fixed-width prefix, groups packets by
//! `FCType` and feeds every `sMessage` payload into a per-type
//! [`SchemaBuilder`]. The result is one document mapping each packet type to
//! a schema that validates all of its observed payloads.

mod builder;

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, trace};

pub use builder::{InferredSchema, SchemaBuilder, SCHEMA_URI};

/// Width of the `[timestamp, LOGFILE]` prefix on every log line
pub const LOG_PREFIX_WIDTH: usize = 38;

/// Packet types whose payloads are too varied to summarize usefully
pub const DEFAULT_DENYLIST: &[&str] = &["MANAGELIST", "TAGS", "ROOMDATA"];

/// Default log file written by the packet inspector
pub const DEFAULT_LOG_FILE: &str = "packetLog.txt";

/// Default name of the schema document
pub const DEFAULT_SCHEMA_FILE: &str = "packetLogSchema.json";

/// Field holding the packet type
pub const CATEGORY_FIELD: &str = "FCType";

/// Field holding the packet payload
pub const PAYLOAD_FIELD: &str = "sMessage";

/// One parsed log line
#[derive(Debug, Clone, PartialEq)]
pub struct PacketRecord {
    /// Packet type
    pub category: String,
    /// Payload; `Value::Null` when the field was absent
    pub payload: Value,
}

impl PacketRecord {
    /// Split off the prefix and parse the remainder of a log line.
    ///
    /// `line_number` is 1-based and only used for error reporting.
    pub fn parse_line(line_number: usize, line: &str, prefix_width: usize) -> Result<Self> {
        let body = strip_prefix(line, prefix_width).ok_or_else(|| {
            Error::malformed_line(
                line_number,
                format!("shorter than the {prefix_width}-character prefix"),
            )
        })?;

        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::malformed_line(line_number, e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(Error::malformed_line(line_number, "expected a JSON object"));
        };

        let category = match fields.remove(CATEGORY_FIELD) {
            None | Some(Value::Null) => {
                return Err(Error::missing_field(line_number, CATEGORY_FIELD));
            }
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        };
        let payload = fields.remove(PAYLOAD_FIELD).unwrap_or(Value::Null);

        Ok(Self { category, payload })
    }
}

/// Drop the first `width` characters, or `None` if the line is shorter
fn strip_prefix(line: &str, width: usize) -> Option<&str> {
    if width == 0 {
        return Some(line);
    }
    let (idx, ch) = line.char_indices().nth(width - 1)?;
    Some(&line[idx + ch.len_utf8()..])
}

/// Configuration for schema inference
#[derive(Debug, Clone)]
pub struct InferencerConfig {
    /// Number of leading characters discarded from every line
    pub prefix_width: usize,
    /// Packet types that are skipped entirely
    pub denylist: Vec<String>,
}

impl Default for InferencerConfig {
    fn default() -> Self {
        Self {
            prefix_width: LOG_PREFIX_WIDTH,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl InferencerConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prefix width
    pub fn prefix_width(mut self, width: usize) -> Self {
        self.prefix_width = width;
        self
    }

    /// Replaces the denylist
    pub fn denylist<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist = categories.into_iter().map(Into::into).collect();
        self
    }
}

/// Accumulates one schema per packet type
#[derive(Debug, Clone)]
pub struct SchemaInferencer<B = InferredSchema> {
    config: InferencerConfig,
    accumulators: BTreeMap<String, B>,
    lines_read: usize,
    skipped: usize,
}

impl Default for SchemaInferencer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaInferencer {
    /// Creates an inferencer using [`InferredSchema`] and the default config
    pub fn new() -> Self {
        Self::with_config(InferencerConfig::default())
    }
}

impl<B: SchemaBuilder + Default> SchemaInferencer<B> {
    /// Creates an inferencer with custom configuration
    pub fn with_config(config: InferencerConfig) -> Self {
        Self {
            config,
            accumulators: BTreeMap::new(),
            lines_read: 0,
            skipped: 0,
        }
    }

    /// Returns true if packets of `category` are excluded
    pub fn is_denied(&self, category: &str) -> bool {
        self.config.denylist.iter().any(|d| d == category)
    }

    /// Feed one parsed record
    pub fn observe_record(&mut self, record: &PacketRecord) {
        if self.is_denied(&record.category) {
            trace!("Skipping denylisted {} packet", record.category);
            self.skipped += 1;
            return;
        }
        self.accumulators
            .entry(record.category.clone())
            .or_default()
            .observe(&record.payload);
    }

    /// Parse and feed one raw log line
    pub fn observe_line(&mut self, line: &str) -> Result<()> {
        self.lines_read += 1;
        let record = PacketRecord::parse_line(self.lines_read, line, self.config.prefix_width)?;
        self.observe_record(&record);
        Ok(())
    }

    /// Feed every line of `reader`
    pub fn observe_reader(&mut self, reader: impl BufRead) -> Result<()> {
        for line in reader.lines() {
            let line = line.map_err(|e| {
                Error::malformed_line(self.lines_read + 1, format!("unreadable: {e}"))
            })?;
            self.observe_line(&line)?;
        }
        debug!(
            "Read {} lines, skipped {} denylisted packets",
            self.lines_read, self.skipped
        );
        Ok(())
    }

    /// Packet types seen so far, in lexicographic order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.accumulators.keys().map(String::as_str)
    }

    /// Number of lines consumed
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Number of records dropped by the denylist
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Render every accumulated schema into one document keyed by packet type
    pub fn render(&self) -> Value {
        let schemas: Map<String, Value> = self
            .accumulators
            .iter()
            .map(|(category, builder)| (category.clone(), builder.render()))
            .collect();
        Value::Object(schemas)
    }
}

/// Infer schemas for every packet type in the log at `path`
pub fn infer_from_file(path: impl AsRef<Path>, config: InferencerConfig) -> Result<Value> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::file_read(path, e))?;

    let mut inferencer: SchemaInferencer = SchemaInferencer::with_config(config);
    inferencer.observe_reader(BufReader::new(file))?;

    info!(
        "Inferred schemas for {} packet types from {} lines",
        inferencer.categories().count(),
        inferencer.lines_read()
    );
    Ok(inferencer.render())
}
