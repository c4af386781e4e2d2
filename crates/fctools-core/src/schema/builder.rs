//! Incremental JSON schema inference.
//!
//! [`InferredSchema`] absorbs JSON values one at a time and renders a
//! JSON-Schema document that validates every value it has seen. The schema
//! itself is built by [`genson_rs`]:
//!
//! - one observed kind renders as `"type": "<kind>"`, several as `anyOf`
//! - object properties merge recursively; a key is `required` only if every
//!   observed object at that position carried it
//! - array elements all merge into a single `items` schema
//!
//! Distinct values are kept in sorted order and replayed into a fresh genson
//! builder on every render, so the output depends only on the set of
//! observed values.

use genson_rs::{build_json_schema, get_builder, BuildConfig};
use serde_json::Value;
use std::collections::BTreeSet;

/// Dialect URI written at the root of every rendered schema
pub const SCHEMA_URI: &str = "http://json-schema.org/schema#";

/// An accumulator that learns the shape of the values it observes
pub trait SchemaBuilder {
    /// Absorb one value; structure already seen is never forgotten
    fn observe(&mut self, value: &Value);

    /// Render a JSON-Schema document describing everything observed so far
    fn render(&self) -> Value;
}

/// genson-backed schema accumulator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredSchema {
    observed: BTreeSet<String>,
}

impl InferredSchema {
    /// Creates an accumulator that has seen nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct values observed
    pub fn distinct(&self) -> usize {
        self.observed.len()
    }
}

impl SchemaBuilder for InferredSchema {
    fn observe(&mut self, value: &Value) {
        self.observed.insert(value.to_string());
    }

    fn render(&self) -> Value {
        let mut builder = get_builder(Some(SCHEMA_URI));
        // Each observed value is one complete document; a top-level array is
        // a value in its own right, not a batch of values.
        let config = BuildConfig {
            delimiter: None,
            ignore_outer_array: false,
        };
        for text in &self.observed {
            let mut document = text.clone().into_bytes();
            build_json_schema(&mut builder, &mut document, &config);
        }
        builder.to_schema()
    }
}
