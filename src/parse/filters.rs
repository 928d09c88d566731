//! Content filters run after a document has been parsed
//!
//! Filters may enrich the metadata of any document in the `ParseResult` or add
//! sub-documents. They are looked up by identifier from `parse-filters`.

use crate::config::{Config, FilterEntry};
use crate::parse::html::normalize_whitespace;
use crate::parse::ParseResult;
use crate::{ConfigError, ParseFilterError};
use scraper::{Html, Selector};
use std::fmt;
use url::Url;

/// Metadata key written by [`TitleFilter`]
pub const TITLE_KEY: &str = "parse.title";

/// Metadata key written by [`CanonicalFilter`]
pub const CANONICAL_KEY: &str = "canonical";

/// A content filter
pub trait ParseFilter: Send + Sync {
    fn name(&self) -> &str;

    /// Inspects the parsed document and updates `parse` in place
    ///
    /// # Arguments
    ///
    /// * `url` - URL of the parent document
    /// * `content` - Raw bytes of the parent document
    /// * `document` - Parsed document tree
    /// * `parse` - Result being built, parent document included
    fn filter(
        &self,
        url: &str,
        content: &[u8],
        document: &Html,
        parse: &mut ParseResult,
    ) -> Result<(), ParseFilterError>;
}

type ParseFilterConstructor =
    fn(&Config, &FilterEntry) -> Result<Box<dyn ParseFilter>, ConfigError>;

const REGISTRY: &[(&str, ParseFilterConstructor)] = &[
    ("title", build_title),
    ("canonical", build_canonical),
];

fn build_title(
    _config: &Config,
    _entry: &FilterEntry,
) -> Result<Box<dyn ParseFilter>, ConfigError> {
    Ok(Box::new(TitleFilter))
}

fn build_canonical(
    _config: &Config,
    _entry: &FilterEntry,
) -> Result<Box<dyn ParseFilter>, ConfigError> {
    Ok(Box::new(CanonicalFilter))
}

/// Ordered chain of content filters
#[derive(Default)]
pub struct ParseFilters {
    filters: Vec<Box<dyn ParseFilter>>,
}

impl ParseFilters {
    pub fn new(filters: Vec<Box<dyn ParseFilter>>) -> Self {
        Self { filters }
    }

    /// Builds the chain declared in `parse-filters`
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut filters = Vec::with_capacity(config.parse_filters.len());
        for entry in &config.parse_filters {
            let (_, constructor) = REGISTRY
                .iter()
                .find(|(id, _)| *id == entry.id)
                .ok_or_else(|| ConfigError::UnknownFilter {
                    kind: "parse",
                    id: entry.id.clone(),
                })?;
            filters.push(constructor(config, entry)?);
        }
        Ok(Self { filters })
    }

    /// Returns true if `id` names a registered filter
    pub fn is_registered(id: &str) -> bool {
        REGISTRY.iter().any(|(known, _)| *known == id)
    }

    /// Runs every filter in order, stopping at the first failure
    pub fn run(
        &self,
        url: &str,
        content: &[u8],
        document: &Html,
        parse: &mut ParseResult,
    ) -> Result<(), ParseFilterError> {
        for filter in &self.filters {
            filter.filter(url, content, document, parse)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for ParseFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}

fn selector(filter: &str, css: &str) -> Result<Selector, ParseFilterError> {
    Selector::parse(css).map_err(|e| ParseFilterError {
        filter: filter.to_string(),
        message: format!("invalid selector '{}': {:?}", css, e),
    })
}

/// Stores the `<title>` text of the parent document
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleFilter;

impl ParseFilter for TitleFilter {
    fn name(&self) -> &str {
        "title"
    }

    fn filter(
        &self,
        url: &str,
        _content: &[u8],
        document: &Html,
        parse: &mut ParseResult,
    ) -> Result<(), ParseFilterError> {
        let title_selector = selector(self.name(), "title")?;

        let title = document
            .select(&title_selector)
            .next()
            .map(|element| normalize_whitespace(&element.text().collect::<String>()))
            .filter(|title| !title.is_empty());

        if let Some(title) = title {
            parse.get_or_insert(url).metadata.set_value(TITLE_KEY, title);
        }
        Ok(())
    }
}

/// Stores the resolved `<link rel="canonical">` target of the parent document
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalFilter;

impl ParseFilter for CanonicalFilter {
    fn name(&self) -> &str {
        "canonical"
    }

    fn filter(
        &self,
        url: &str,
        _content: &[u8],
        document: &Html,
        parse: &mut ParseResult,
    ) -> Result<(), ParseFilterError> {
        let link_selector = selector(self.name(), "link[rel][href]")?;

        let href = document
            .select(&link_selector)
            .filter(|element| {
                element.value().attr("rel").is_some_and(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("canonical"))
                })
            })
            .find_map(|element| element.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty());

        let Some(href) = href else {
            return Ok(());
        };

        match Url::parse(url).and_then(|base| base.join(href)) {
            Ok(canonical) => {
                parse
                    .get_or_insert(url)
                    .metadata
                    .set_value(CANONICAL_KEY, canonical.as_str());
            }
            Err(e) => tracing::debug!("Ignoring canonical link {} on {}: {}", href, url, e),
        }
        Ok(())
    }
}
