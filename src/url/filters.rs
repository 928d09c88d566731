//! URL filter chain
//!
//! A chain is an ordered list of stages sharing one contract: take a
//! candidate URL and return a (possibly rewritten) URL, or `None` to drop it.
//! The first `None` short-circuits the chain.

use crate::config::{Config, FilterEntry};
use crate::metadata::Metadata;
use crate::url::matcher::HostDenyFilter;
use crate::url::normalize::BasicNormalizer;
use crate::ConfigError;
use std::fmt;
use url::Url;

/// A single stage of the URL filter chain
///
/// Implementations are shared read-only by every worker.
pub trait UrlFilter: Send + Sync {
    /// Registry identifier of this stage
    fn name(&self) -> &str;

    /// Filters a candidate URL found on `source_url`
    ///
    /// # Returns
    ///
    /// * `Some(String)` - The URL to pass to the next stage
    /// * `None` - The candidate is dropped
    fn filter(
        &self,
        source_url: &Url,
        source_metadata: &Metadata,
        candidate: &str,
    ) -> Option<String>;
}

type UrlFilterConstructor = fn(&Config, &FilterEntry) -> Result<Box<dyn UrlFilter>, ConfigError>;

/// Known stage identifiers and how to build them
const REGISTRY: &[(&str, UrlFilterConstructor)] = &[
    ("basic-normalizer", build_basic_normalizer),
    ("host-deny", build_host_deny),
];

fn build_basic_normalizer(
    config: &Config,
    _entry: &FilterEntry,
) -> Result<Box<dyn UrlFilter>, ConfigError> {
    Ok(Box::new(BasicNormalizer::new(&config.normalizer)))
}

fn build_host_deny(
    _config: &Config,
    entry: &FilterEntry,
) -> Result<Box<dyn UrlFilter>, ConfigError> {
    let patterns = entry.string_list("patterns");
    if patterns.is_empty() {
        return Err(ConfigError::Validation(
            "host-deny filter requires at least one pattern".to_string(),
        ));
    }
    Ok(Box::new(HostDenyFilter::new(patterns)))
}

/// Ordered chain of URL filters
#[derive(Default)]
pub struct UrlFilters {
    stages: Vec<Box<dyn UrlFilter>>,
}

impl UrlFilters {
    /// A chain that passes every candidate through unchanged
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(stages: Vec<Box<dyn UrlFilter>>) -> Self {
        Self { stages }
    }

    /// Builds the chain declared in `url-filters`
    ///
    /// Unknown identifiers fail here, before any document is processed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut stages = Vec::with_capacity(config.url_filters.len());
        for entry in &config.url_filters {
            let constructor = REGISTRY
                .iter()
                .find(|(id, _)| *id == entry.id)
                .map(|(_, constructor)| constructor)
                .ok_or_else(|| ConfigError::UnknownFilter {
                    kind: "URL",
                    id: entry.id.clone(),
                })?;
            stages.push(constructor(config, entry)?);
        }
        if !stages.iter().any(|stage| stage.name() == "basic-normalizer") {
            tracing::warn!(
                "URL filter chain has no basic-normalizer; outlinks will not be canonical"
            );
        }
        tracing::debug!("Built URL filter chain with {} stages", stages.len());
        Ok(Self { stages })
    }

    /// Returns true if `id` names a registered stage
    pub fn is_registered(id: &str) -> bool {
        REGISTRY.iter().any(|(known, _)| *known == id)
    }

    /// Runs `candidate` through every stage in order
    pub fn filter(
        &self,
        source_url: &Url,
        source_metadata: &Metadata,
        candidate: &str,
    ) -> Option<String> {
        let mut current = candidate.to_string();
        for stage in &self.stages {
            match stage.filter(source_url, source_metadata, &current) {
                Some(next) => current = next,
                None => {
                    tracing::trace!("{} dropped {}", stage.name(), candidate);
                    return None;
                }
            }
        }
        Some(current)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for UrlFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|stage| stage.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Appends a marker to every candidate and counts its calls
    struct Suffix {
        suffix: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl UrlFilter for Suffix {
        fn name(&self) -> &str {
            "suffix"
        }

        fn filter(&self, _: &Url, _: &Metadata, candidate: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(format!("{}{}", candidate, self.suffix))
        }
    }

    struct DropAll;

    impl UrlFilter for DropAll {
        fn name(&self) -> &str {
            "drop-all"
        }

        fn filter(&self, _: &Url, _: &Metadata, _: &str) -> Option<String> {
            None
        }
    }

    fn source() -> Url {
        Url::parse("http://source.com/").unwrap()
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let chain = UrlFilters::empty();
        assert_eq!(
            chain.filter(&source(), &Metadata::new(), "whatever"),
            Some("whatever".to_string())
        );
    }

    #[test]
    fn test_stages_applied_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = UrlFilters::new(vec![
            Box::new(Suffix { suffix: "a", calls: calls.clone() }),
            Box::new(Suffix { suffix: "b", calls: calls.clone() }),
        ]);
        assert_eq!(
            chain.filter(&source(), &Metadata::new(), "x"),
            Some("xab".to_string())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_rejection_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = UrlFilters::new(vec![
            Box::new(DropAll),
            Box::new(Suffix { suffix: "a", calls: calls.clone() }),
        ]);
        assert_eq!(chain.filter(&source(), &Metadata::new(), "x"), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_default_config_builds_normalizer() {
        let chain = UrlFilters::from_config(&Config::default()).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(
            chain.filter(&source(), &Metadata::new(), "HTTP://A.COM/b#c"),
            Some("http://a.com/b".to_string())
        );
    }

    #[test]
    fn test_unknown_id_fails_eagerly() {
        let mut config = Config::default();
        config.url_filters.push(FilterEntry::new("does-not-exist"));
        assert!(matches!(
            UrlFilters::from_config(&config),
            Err(ConfigError::UnknownFilter { .. })
        ));
    }

    #[test]
    fn test_normalizer_then_host_deny() {
        let mut config = Config::default();
        let mut entry = FilterEntry::new("host-deny");
        entry.params.insert(
            "patterns".to_string(),
            toml::Value::Array(vec![toml::Value::String("*.spam.com".to_string())]),
        );
        config.url_filters.push(entry);

        let chain = UrlFilters::from_config(&config).unwrap();
        assert_eq!(format!("{:?}", chain), r#"["basic-normalizer", "host-deny"]"#);
        assert_eq!(
            chain.filter(&source(), &Metadata::new(), "http://WWW.Spam.com/x"),
            None
        );
        assert_eq!(
            chain.filter(&source(), &Metadata::new(), "http://ham.com/x"),
            Some("http://ham.com/x".to_string())
        );
    }

    #[test]
    fn test_registry() {
        assert!(UrlFilters::is_registered("basic-normalizer"));
        assert!(UrlFilters::is_registered("host-deny"));
        assert!(!UrlFilters::is_registered("regex"));
    }
}
