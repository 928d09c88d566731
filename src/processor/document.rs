//! Per-document processing
//!
//! Content-type check, charset detection, parsing, robots directives, outlink
//! extraction and content filters, with every failure classified into a
//! single error outcome.

use crate::config::{Config, ParserConfig};
use crate::parse::{
    charset_from_content_type, CharsetDetector, ContentParser, HtmlParser, OutlinkExtractor,
    ParseData, ParseFilters, ParseResult, RobotsTags, SniffingCharsetDetector,
    CONTENT_ENCODING_KEY,
};
use crate::processor::{
    EventCounter, ParsedRecord, ProcessingResult, Status, StatusEvent, WorkItem,
};
use crate::{ConfigError, Metadata, ProcessingError};
use std::time::Instant;

/// Metadata key holding the transport content type
const CONTENT_TYPE_KEY: &str = "Content-Type";

/// Turns work items into parsed records and discovery events
///
/// Shared read-only by all workers; the only mutable state is the event
/// counter.
pub struct DocumentProcessor {
    parser: Box<dyn ContentParser>,
    charset_detector: Box<dyn CharsetDetector>,
    extractor: OutlinkExtractor,
    parse_filters: ParseFilters,
    config: ParserConfig,
    counters: EventCounter,
}

impl DocumentProcessor {
    /// Builds a processor with the HTML parser and sniffing charset detector
    ///
    /// # Returns
    ///
    /// * `Ok(DocumentProcessor)` - Ready to process
    /// * `Err(ConfigError)` - A filter identifier is unknown or misconfigured
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let processor = Self {
            parser: Box::new(HtmlParser),
            charset_detector: Box::new(SniffingCharsetDetector),
            extractor: OutlinkExtractor::from_config(config)?,
            parse_filters: ParseFilters::from_config(config)?,
            config: config.parser.clone(),
            counters: EventCounter::new(),
        };
        tracing::debug!(
            "Document processor ready with {} parse filters",
            processor.parse_filters.len()
        );
        Ok(processor)
    }

    /// Replaces the content parser
    pub fn with_parser(mut self, parser: Box<dyn ContentParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Replaces the charset detector
    pub fn with_charset_detector(mut self, detector: Box<dyn CharsetDetector>) -> Self {
        self.charset_detector = detector;
        self
    }

    /// Replaces the content filters
    pub fn with_parse_filters(mut self, filters: ParseFilters) -> Self {
        self.parse_filters = filters;
        self
    }

    pub fn counters(&self) -> &EventCounter {
        &self.counters
    }

    /// Processes one work item
    ///
    /// Never panics on bad input: every failure becomes
    /// `ProcessingResult::Error` with its error source.
    pub fn process(&self, item: WorkItem) -> ProcessingResult {
        let WorkItem {
            url,
            content,
            mut metadata,
            ..
        } = item;

        tracing::info!("Parsing : starting {}", url);
        let start = Instant::now();

        let content_type = metadata
            .first_value_ignore_case(CONTENT_TYPE_KEY)
            .unwrap_or_default()
            .to_string();

        if !is_html(&content_type) {
            if self.config.treat_non_html_as_error {
                let error = ProcessingError::ContentType {
                    url: url.clone(),
                    content_type,
                };
                return self.fail(url, metadata, error);
            }

            tracing::debug!("Passing through {} with content type {}", url, content_type);
            self.counters.incr("tuple_success");
            return ProcessingResult::Success {
                records: vec![ParsedRecord {
                    url,
                    content,
                    metadata,
                    text: String::new(),
                }],
                discoveries: Vec::new(),
            };
        }

        let declared = charset_from_content_type(&content_type);
        let charset = self.charset_detector.detect(&content, declared.as_deref());
        metadata.set_value(CONTENT_ENCODING_KEY, charset.as_str());

        let parsed = match self.parser.parse(&content, &charset) {
            Ok(parsed) => parsed,
            Err(source) => {
                self.counters.incr("parse exception");
                let error = ProcessingError::Parsing {
                    url: url.clone(),
                    source,
                };
                return self.fail(url, metadata, error);
            }
        };

        let mut robots = RobotsTags::from_metadata(&metadata);
        for directives in &parsed.robots_meta {
            robots.add_directives(directives);
        }
        robots.write_to(&mut metadata);

        let outlinks = self.extractor.extract(
            &url,
            &metadata,
            parsed.base_href.as_deref(),
            &parsed.links,
            robots.no_follow,
            &self.counters,
        );

        let mut parse = ParseResult::new(
            url.as_str(),
            ParseData {
                content: content.clone(),
                metadata,
                text: parsed.text,
            },
        );
        parse.set_outlinks(outlinks);

        if let Err(source) = self
            .parse_filters
            .run(&url, &content, &parsed.document, &mut parse)
        {
            let metadata = parse
                .get(&url)
                .map(|parent| parent.metadata.clone())
                .unwrap_or_default();
            let error = ProcessingError::Filtering {
                url: url.clone(),
                source,
            };
            return self.fail(url, metadata, error);
        }

        let (documents, outlinks) = parse.into_parts();

        let discoveries = if self.config.emit_outlinks {
            outlinks
                .into_iter()
                .map(|outlink| StatusEvent {
                    url: outlink.target_url,
                    metadata: outlink.metadata,
                    status: Status::Discovered,
                })
                .collect()
        } else {
            Vec::new()
        };

        let records: Vec<ParsedRecord> = documents
            .into_iter()
            .map(|(url, data)| ParsedRecord {
                url,
                content: data.content,
                metadata: data.metadata,
                text: data.text,
            })
            .collect();

        self.counters.incr("tuple_success");
        tracing::info!(
            "Parsed {} in {} msec ({} records, {} discovered)",
            url,
            start.elapsed().as_millis(),
            records.len(),
            discoveries.len()
        );

        ProcessingResult::Success {
            records,
            discoveries,
        }
    }

    /// Classifies a document-level failure
    pub(crate) fn fail(
        &self,
        url: String,
        metadata: Metadata,
        error: ProcessingError,
    ) -> ProcessingResult {
        tracing::error!("{}", error);
        self.counters
            .incr(&format!("error_{}", error.error_source().replace(' ', "_")));
        ProcessingResult::failure(url, metadata, error)
    }
}

/// A blank content type is assumed to be HTML
fn is_html(content_type: &str) -> bool {
    let content_type = content_type.trim();
    content_type.is_empty() || content_type.to_ascii_lowercase().contains("html")
}
