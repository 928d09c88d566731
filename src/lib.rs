//! Ripple-Parse: URL canonicalization and outlink extraction for a distributed crawler
//!
//! This crate turns fetched documents into parsed records and discovery events.
//! It produces one canonical string per URL so that equivalent URLs are
//! recognised as duplicates across the crawl, and it extracts, resolves,
//! filters, deduplicates and annotates the outlinks of every document.

pub mod config;
pub mod metadata;
pub mod parse;
pub mod processor;
pub mod url;

use thiserror::Error;

/// Main error type for Ripple-Parse operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown {kind} filter '{id}'")]
    UnknownFilter { kind: &'static str, id: String },

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
///
/// These never escape the processing of a single candidate: a rejected URL is
/// dropped from whatever set it belonged to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Malformed URL: {0}")]
    Malformed(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}

/// Failure raised by a content parser
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseFailure(pub String);

/// Failure raised by a content filter
#[derive(Debug, Error)]
#[error("{filter}: {message}")]
pub struct ParseFilterError {
    pub filter: String,
    pub message: String,
}

/// Document-level failures, each one classified with a fixed error source
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Exception content-type {content_type} for {url}")]
    ContentType { url: String, content_type: String },

    #[error("Exception while parsing {url}: {source}")]
    Parsing { url: String, source: ParseFailure },

    #[error("Exception while running parse filters on {url}: {source}")]
    Filtering {
        url: String,
        source: ParseFilterError,
    },

    #[error("Processing of {url} panicked: {message}")]
    Panicked { url: String, message: String },
}

impl ProcessingError {
    /// The label reported as `error.source` on the status stream
    pub fn error_source(&self) -> &'static str {
        match self {
            Self::ContentType { .. } => "content-type checking",
            Self::Parsing { .. } => "content parsing",
            Self::Filtering { .. } => "content filtering",
            Self::Panicked { .. } => "processing",
        }
    }
}

/// Result type alias for Ripple-Parse operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use metadata::Metadata;
pub use parse::Outlink;
pub use processor::{Dispatcher, DocumentProcessor, ProcessingResult, WorkItem};
pub use url::{BasicNormalizer, UrlFilter, UrlFilters};
