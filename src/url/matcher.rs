use crate::metadata::Metadata;
use crate::url::filters::UrlFilter;
use url::Url;

/// Checks if a host matches a domain pattern
///
/// `example.com` matches only itself; `*.example.com` matches the bare domain
/// and any subdomain at any depth.
///
/// # Examples
///
/// ```
/// use ripple_parse::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || (host.len() > base.len()
                    && host.ends_with(base)
                    && host.as_bytes()[host.len() - base.len() - 1] == b'.')
        }
        None => host == pattern,
    }
}

/// Drops candidates whose host matches any configured pattern
///
/// A scope restriction stage for the URL filter chain. Candidates that do not
/// parse are dropped as well, since nothing downstream could fetch them.
#[derive(Debug, Clone)]
pub struct HostDenyFilter {
    patterns: Vec<String>,
}

impl HostDenyFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns: patterns.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }
}

impl UrlFilter for HostDenyFilter {
    fn name(&self) -> &str {
        "host-deny"
    }

    fn filter(
        &self,
        _source_url: &Url,
        _source_metadata: &Metadata,
        candidate: &str,
    ) -> Option<String> {
        let parsed = Url::parse(candidate).ok()?;
        let host = parsed.host_str().map(str::to_lowercase).unwrap_or_default();

        if let Some(pattern) = self
            .patterns
            .iter()
            .find(|pattern| matches_wildcard(pattern, &host))
        {
            tracing::debug!("Host of {} denied by pattern {}", candidate, pattern);
            return None;
        }

        Some(candidate.to_string())
    }
}
