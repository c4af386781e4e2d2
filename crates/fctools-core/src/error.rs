//! Error types for the fctools-core library.
//!
//! Every failure in either pipeline is fatal for the run, so the variants
//! here exist to describe the cause precisely rather than to drive recovery.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fctools operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all fctools operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The request for a remote resource could not complete
    #[error("failed to fetch '{url}': {source}")]
    Fetch {
        /// URL that was requested
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The remote resource answered with a non-success status
    #[error("fetching '{url}' returned HTTP {status}")]
    HttpStatus {
        /// URL that was requested
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// A fetched body is not valid UTF-8
    #[error("body of '{url}' is not valid UTF-8: {source}")]
    InvalidEncoding {
        /// URL that was requested
        url: String,
        /// Underlying decoding error
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The fetched server configuration is not valid JSON
    #[error("server configuration is not valid JSON: {0}")]
    ConfigParse(#[source] serde_json::Error),

    /// A log line could not be split or parsed into a packet record
    #[error("malformed log line {line}: {details}")]
    MalformedLine {
        /// 1-based line number in the log
        line: usize,
        /// Description of what was wrong with the line
        details: String,
    },

    /// A parsed packet record lacks a field the pipeline depends on
    #[error("log line {line} is missing required field '{field}'")]
    MissingField {
        /// 1-based line number in the log
        line: usize,
        /// Name of the missing field
        field: &'static str,
    },

    /// A scanned constant value does not fit in 64 bits
    #[error("constant {category}_{name} has out-of-range value '{raw}'")]
    ConstantOutOfRange {
        /// Category the constant belongs to
        category: String,
        /// Constant name within the category
        name: String,
        /// The digits as they appeared in the script
        raw: String,
    },

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The constant pattern could not be compiled
    #[error("invalid constant pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new fetch error
    pub fn fetch(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Fetch {
            url: url.into(),
            source,
        }
    }

    /// Creates a new HTTP status error
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a new invalid encoding error
    pub fn invalid_encoding(url: impl Into<String>, source: std::string::FromUtf8Error) -> Self {
        Self::InvalidEncoding {
            url: url.into(),
            source,
        }
    }

    /// Creates a new malformed line error
    pub fn malformed_line(line: usize, details: impl Into<String>) -> Self {
        Self::MalformedLine {
            line,
            details: details.into(),
        }
    }

    /// Creates a new missing field error
    pub fn missing_field(line: usize, field: &'static str) -> Self {
        Self::MissingField { line, field }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this error came from the network rather than from
    /// the content that was fetched or read
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::HttpStatus { .. })
    }
}
