//! Document parsing for Ripple-Parse
//!
//! This module turns fetched bytes into:
//! - Raw links with their anchor text and no-follow flags
//! - Robots directives and the decoded body text
//! - Deduplicated, canonical outlinks
//! - A `ParseResult` holding the parent document and any sub-documents

mod charset;
mod filters;
mod html;
mod outlinks;
mod robots;

pub use charset::{charset_from_content_type, decode, CharsetDetector, SniffingCharsetDetector};
pub use filters::{
    CanonicalFilter, ParseFilter, ParseFilters, TitleFilter, CANONICAL_KEY, TITLE_KEY,
};
pub use html::{ContentParser, HtmlParser, ParsedContent};
pub use outlinks::OutlinkExtractor;
pub use robots::{RobotsTags, NO_CACHE_KEY, NO_FOLLOW_KEY, NO_INDEX_KEY, ROBOTS_HEADER};

use crate::metadata::Metadata;

/// Metadata key listing the anchor texts of an outlink
pub const ANCHORS_KEY: &str = "anchors";

/// Metadata key holding the charset used to decode a document
pub const CONTENT_ENCODING_KEY: &str = "parse.Content-Encoding";

/// A link as it appears in the document, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub href: String,
    pub anchor: String,
    /// Set when the link carries `rel="nofollow"`
    pub no_follow: bool,
}

impl RawLink {
    pub fn new(href: impl Into<String>, anchor: impl Into<String>, no_follow: bool) -> Self {
        Self {
            href: href.into(),
            anchor: anchor.into(),
            no_follow,
        }
    }
}

/// A link target discovered in a document
///
/// Identity is `target_url`, which is always canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outlink {
    pub target_url: String,
    /// First non-blank anchor text seen for this target
    pub anchor: Option<String>,
    pub metadata: Metadata,
}

/// Parsed state of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseData {
    pub content: Vec<u8>,
    pub metadata: Metadata,
    pub text: String,
}

/// Everything produced by parsing one work item
///
/// Documents are kept in insertion order; the parent document always comes
/// first. Content filters may add sub-documents.
#[derive(Debug, Clone)]
pub struct ParseResult {
    documents: Vec<(String, ParseData)>,
    outlinks: Vec<Outlink>,
}

impl ParseResult {
    /// Creates a result holding only the parent document
    pub fn new(url: impl Into<String>, parent: ParseData) -> Self {
        Self {
            documents: vec![(url.into(), parent)],
            outlinks: Vec::new(),
        }
    }

    pub fn get(&self, url: &str) -> Option<&ParseData> {
        self.documents
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, data)| data)
    }

    pub fn get_mut(&mut self, url: &str) -> Option<&mut ParseData> {
        self.documents
            .iter_mut()
            .find(|(u, _)| u == url)
            .map(|(_, data)| data)
    }

    /// Returns the document for `url`, appending an empty one if absent
    pub fn get_or_insert(&mut self, url: &str) -> &mut ParseData {
        let index = match self.documents.iter().position(|(u, _)| u == url) {
            Some(index) => index,
            None => {
                self.documents.push((url.to_string(), ParseData::default()));
                self.documents.len() - 1
            }
        };
        &mut self.documents[index].1
    }

    /// Iterates over documents, parent first
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParseData)> {
        self.documents.iter().map(|(url, data)| (url.as_str(), data))
    }

    pub fn outlinks(&self) -> &[Outlink] {
        &self.outlinks
    }

    pub fn set_outlinks(&mut self, outlinks: Vec<Outlink>) {
        self.outlinks = outlinks;
    }

    /// Number of documents, parent included
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Splits into documents and outlinks
    pub fn into_parts(self) -> (Vec<(String, ParseData)>, Vec<Outlink>) {
        (self.documents, self.outlinks)
    }
}
