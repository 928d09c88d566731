//! URL handling module for Ripple-Parse
//!
//! This module provides the canonicalizer, the URL filter chain it plugs into,
//! and the host-based scope filter.

mod escape;
mod filters;
mod matcher;
mod normalize;
mod parts;

pub use filters::{UrlFilter, UrlFilters};
pub use matcher::{matches_wildcard, HostDenyFilter};
pub use normalize::BasicNormalizer;

use crate::config::NormalizerConfig;
use crate::UrlResult;

/// Canonicalizes a URL with the given toggles
///
/// Convenience wrapper for one-off use; long-running callers should build a
/// [`BasicNormalizer`] once and share it.
///
/// # Examples
///
/// ```
/// use ripple_parse::config::NormalizerConfig;
/// use ripple_parse::url::canonicalize;
///
/// let url = canonicalize(&NormalizerConfig::default(), "http://x.com&a=b").unwrap();
/// assert_eq!(url, "http://x.com?a=b");
/// ```
pub fn canonicalize(config: &NormalizerConfig, candidate: &str) -> UrlResult<String> {
    BasicNormalizer::new(config).normalize(candidate)
}
