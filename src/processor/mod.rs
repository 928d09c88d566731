//! Document processing pipeline
//!
//! A `DocumentProcessor` turns one `WorkItem` into a `ProcessingResult`. The
//! `Dispatcher` drives many of them concurrently and owns acknowledgment:
//! every work item is acknowledged exactly once, after all of its events.

mod counters;
mod dispatcher;
mod document;

pub use counters::EventCounter;
pub use dispatcher::{work_queue, Collector, DispatchSummary, Dispatcher};
pub use document::DocumentProcessor;

use crate::metadata::Metadata;
use crate::ProcessingError;

/// Metadata key carrying the error source of a failed item
pub const ERROR_SOURCE_KEY: &str = "error.source";

/// Metadata key carrying the error message of a failed item
pub const ERROR_MESSAGE_KEY: &str = "error.message";

/// A fetched document waiting to be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Identifier used for acknowledgment
    pub id: u64,
    pub url: String,
    pub content: Vec<u8>,
    pub metadata: Metadata,
}

/// A parsed document, sent on the primary output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub url: String,
    pub content: Vec<u8>,
    pub metadata: Metadata,
    pub text: String,
}

/// Status reported for a URL on the status output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Discovered,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "DISCOVERED",
            Self::Error => "ERROR",
        }
    }
}

/// An event on the status output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub url: String,
    pub metadata: Metadata,
    pub status: Status,
}

/// Outcome of processing one work item
#[derive(Debug)]
pub enum ProcessingResult {
    /// Parsed records (parent first) and one discovery event per outlink
    Success {
        records: Vec<ParsedRecord>,
        discoveries: Vec<StatusEvent>,
    },

    /// The single error event for the item
    Error {
        error: ProcessingError,
        event: StatusEvent,
    },
}

impl ProcessingResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Builds the error outcome, recording source and message in `metadata`
    pub(crate) fn failure(url: String, mut metadata: Metadata, error: ProcessingError) -> Self {
        metadata.set_value(ERROR_SOURCE_KEY, error.error_source());
        metadata.set_value(ERROR_MESSAGE_KEY, error.to_string());
        Self::Error {
            error,
            event: StatusEvent {
                url,
                metadata,
                status: Status::Error,
            },
        }
    }
}
