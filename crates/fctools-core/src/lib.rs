//! # fctools-core
//!
//! Developer tooling for the chat protocol client library.
//!
//! This crate provides the core functionality for:
//! - Scanning the site's client script for protocol constant definitions
//! - Regenerating the `Constants.ts` enumerations from those definitions
//! - Inferring a JSON schema per packet type from a captured packet log
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scanner`]: Constant extraction from script text
//! - [`codegen`]: Constant map merging and TypeScript generation
//! - [`schema`]: Packet log parsing and schema inference
//! - [`fetch`]: Remote resource fetching
//! - [`output`]: Atomic publication of generated files
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use fctools_core::{regenerate, HttpFetcher, Scanner, Sources};
//!
//! let fetcher = HttpFetcher::new()?;
//! let regenerated = regenerate(&fetcher, &Scanner::new(), &Sources::default())?;
//! let source = regenerated.generator().render()?;
//! fctools_core::output::write_atomic(std::path::Path::new("Constants.ts"), source.as_bytes())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! The library provides several traits for customization:
//!
//! - [`ScanStrategy`]: Customize how constants are found in script text
//! - [`EnumWriter`]: Customize how the constants file is written
//! - [`SchemaBuilder`]: Swap the schema inference algorithm
//! - [`Fetcher`]: Supply inputs from somewhere other than HTTP
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codegen;
pub mod error;
pub mod fetch;
pub mod json;
pub mod output;
pub mod scanner;
pub mod schema;

// Re-export primary types for convenience
pub use codegen::{
    regenerate, ConstantMap, ConstantsGenerator, EnumWriter, GeneratorConfig, Regenerated,
    Sources, StatsWriter,
};
pub use error::{Error, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use scanner::{ConstantEntry, ScanStrategy, Scanner, ScannerConfig};
pub use schema::{
    infer_from_file, InferencerConfig, InferredSchema, PacketRecord, SchemaBuilder,
    SchemaInferencer,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
