//! Outlink extraction
//!
//! Turns the raw links of a document into unique canonical outlinks: resolve
//! each href against the document base, apply no-follow policy, run the URL
//! filter chain, merge duplicates and attach inherited metadata.

use crate::config::{Config, ParserConfig};
use crate::metadata::{Metadata, MetadataTransfer};
use crate::parse::{Outlink, RawLink, ANCHORS_KEY};
use crate::processor::EventCounter;
use crate::url::UrlFilters;
use crate::ConfigError;
use std::collections::HashMap;
use url::Url;

/// Builds outlinks from raw links
#[derive(Debug)]
pub struct OutlinkExtractor {
    filters: UrlFilters,
    transfer: MetadataTransfer,
    track_anchors: bool,
    strict_no_follow: bool,
}

/// Outlink under construction, before metadata is attached
struct Candidate {
    target_url: String,
    anchors: Vec<String>,
}

impl OutlinkExtractor {
    pub fn new(
        filters: UrlFilters,
        transfer: MetadataTransfer,
        track_anchors: bool,
        strict_no_follow: bool,
    ) -> Self {
        Self {
            filters,
            transfer,
            track_anchors,
            strict_no_follow,
        }
    }

    /// Builds the extractor described by `config`
    ///
    /// When outlinks are not emitted the URL filter chain is left empty.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let ParserConfig {
            emit_outlinks,
            track_anchors,
            robots_no_follow_strict,
            ..
        } = config.parser;

        let filters = if emit_outlinks {
            UrlFilters::from_config(config)?
        } else {
            UrlFilters::empty()
        };

        Ok(Self::new(
            filters,
            MetadataTransfer::new(&config.metadata),
            track_anchors,
            robots_no_follow_strict,
        ))
    }

    /// Extracts the outlinks of one document
    ///
    /// Per-link failures are counted and skipped; they never fail the batch.
    /// Outlinks are returned in the order their target was first seen.
    ///
    /// # Arguments
    ///
    /// * `parent_url` - URL of the document the links were found on
    /// * `parent_metadata` - Metadata of that document
    /// * `base_href` - `<base href>` of the document; relative values are
    ///   resolved against `parent_url`, unusable ones are ignored
    /// * `links` - Raw links in document order
    /// * `page_no_follow` - Page-level no-follow directive
    /// * `counters` - Receives per-link drop counts
    pub fn extract(
        &self,
        parent_url: &str,
        parent_metadata: &Metadata,
        base_href: Option<&str>,
        links: &[RawLink],
        page_no_follow: bool,
        counters: &EventCounter,
    ) -> Vec<Outlink> {
        let source = match Url::parse(parent_url) {
            Ok(source) => source,
            Err(e) => {
                tracing::debug!("Cannot resolve links of invalid URL {}: {}", parent_url, e);
                counters.incr("error_invalid_source_url");
                return Vec::new();
            }
        };
        let base = resolve_base(&source, base_href);

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for link in links {
            let href = link.href.trim();
            if href.is_empty() {
                continue;
            }

            let absolute = match base.join(href) {
                Ok(absolute) => absolute,
                Err(e) => {
                    tracing::debug!("Cannot resolve {} against {}: {}", href, base, e);
                    counters.incr("error_outlink_parsing");
                    continue;
                }
            };

            let no_follow = link.no_follow || page_no_follow;
            if no_follow && self.strict_no_follow {
                counters.incr("outlink_nofollow");
                continue;
            }

            let target_url = match self
                .filters
                .filter(&source, parent_metadata, absolute.as_str())
            {
                Some(target_url) => target_url,
                None => {
                    counters.incr("outlink_filtered");
                    continue;
                }
            };

            let position = *index.entry(target_url.clone()).or_insert_with(|| {
                candidates.push(Candidate {
                    target_url,
                    anchors: Vec::new(),
                });
                candidates.len() - 1
            });

            // anchors of no-follow links are never tracked
            let anchor = link.anchor.trim();
            if self.track_anchors && !no_follow && !anchor.is_empty() {
                candidates[position].anchors.push(anchor.to_string());
            }
        }

        counters.incr_by("outlink_kept", candidates.len() as u64);

        candidates
            .into_iter()
            .map(|candidate| self.build_outlink(candidate, parent_url, parent_metadata))
            .collect()
    }

    fn build_outlink(
        &self,
        candidate: Candidate,
        parent_url: &str,
        parent_metadata: &Metadata,
    ) -> Outlink {
        let mut metadata =
            self.transfer
                .for_outlink(&candidate.target_url, parent_url, parent_metadata);

        let anchor = candidate.anchors.first().cloned();
        if !candidate.anchors.is_empty() {
            metadata.set_values(ANCHORS_KEY, candidate.anchors);
        }

        Outlink {
            target_url: candidate.target_url,
            anchor,
            metadata,
        }
    }
}

/// The URL relative links resolve against: `<base href>` if usable, else the document
fn resolve_base(source: &Url, base_href: Option<&str>) -> Url {
    match base_href.map(|href| source.join(href)) {
        Some(Ok(base)) => base,
        Some(Err(e)) => {
            tracing::debug!("Ignoring unusable <base> on {}: {}", source, e);
            source.clone()
        }
        None => source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::url::{BasicNormalizer, HostDenyFilter};

    fn normalizing_extractor(track_anchors: bool, strict: bool) -> OutlinkExtractor {
        let normalizer = BasicNormalizer::new(&NormalizerConfig::default());
        let filters = UrlFilters::new(vec![Box::new(normalizer)]);
        OutlinkExtractor::new(filters, MetadataTransfer::default(), track_anchors, strict)
    }

    fn extractor(strict: bool) -> OutlinkExtractor {
        normalizing_extractor(true, strict)
    }

    /// Extracts from `http://a.com/` with empty parent metadata and no `<base>`
    fn extract_simple(
        extractor: &OutlinkExtractor,
        links: &[RawLink],
        page_no_follow: bool,
        counters: &EventCounter,
    ) -> Vec<Outlink> {
        let metadata = Metadata::new();
        extractor.extract("http://a.com/", &metadata, None, links, page_no_follow, counters)
    }

    fn targets(outlinks: &[Outlink]) -> Vec<&str> {
        outlinks.iter().map(|o| o.target_url.as_str()).collect()
    }

    #[test]
    fn test_resolves_and_canonicalizes() {
        let counters = EventCounter::new();
        let links = vec![
            RawLink::new("/b#frag", "B", false),
            RawLink::new("HTTP://Other.COM/x", "X", false),
        ];
        let outlinks = extract_simple(&extractor(true), &links, false, &counters);

        assert_eq!(targets(&outlinks), vec!["http://a.com/b", "http://other.com/x"]);
        assert_eq!(outlinks[0].anchor.as_deref(), Some("B"));
        assert_eq!(counters.get("outlink_kept"), 2);
    }

    #[test]
    fn test_absolute_base_href_used() {
        let counters = EventCounter::new();
        let links = vec![
            RawLink::new("page", "P", false),
            RawLink::new("/root", "R", false),
        ];
        let outlinks = extractor(true).extract(
            "http://a.com/x/y",
            &Metadata::new(),
            Some("http://cdn.b.com/dir/"),
            &links,
            false,
            &counters,
        );

        assert_eq!(
            targets(&outlinks),
            vec!["http://cdn.b.com/dir/page", "http://cdn.b.com/root"]
        );
        assert_eq!(
            outlinks[0].metadata.values("url.path"),
            &["http://a.com/x/y".to_string()]
        );
    }

    #[test]
    fn test_relative_base_href_resolved_against_document() {
        let counters = EventCounter::new();
        let links = vec![RawLink::new("page", "P", false)];
        let outlinks = extractor(true).extract(
            "http://a.com/x/y",
            &Metadata::new(),
            Some("/docs/v2/"),
            &links,
            false,
            &counters,
        );

        assert_eq!(targets(&outlinks), vec!["http://a.com/docs/v2/page"]);
    }

    #[test]
    fn test_unusable_base_href_ignored() {
        let counters = EventCounter::new();
        let links = vec![RawLink::new("page", "P", false)];
        let outlinks = extractor(true).extract(
            "http://a.com/x/y",
            &Metadata::new(),
            Some("http://[broken/"),
            &links,
            false,
            &counters,
        );

        assert_eq!(targets(&outlinks), vec!["http://a.com/x/page"]);
    }

    #[test]
    fn test_duplicates_merged_first_non_blank_anchor() {
        let counters = EventCounter::new();
        let links = vec![
            RawLink::new("/home", "", false),
            RawLink::new("/home#top", "Home", false),
            RawLink::new("http://a.com/home", "Start", false),
        ];
        let outlinks = extract_simple(&extractor(true), &links, false, &counters);

        assert_eq!(outlinks.len(), 1);
        assert_eq!(outlinks[0].anchor.as_deref(), Some("Home"));
        assert_eq!(
            outlinks[0].metadata.values(ANCHORS_KEY),
            &["Home".to_string(), "Start".to_string()]
        );
    }

    #[test]
    fn test_blank_href_skipped_silently() {
        let counters = EventCounter::new();
        let links = vec![RawLink::new("   ", "nothing", false)];
        let outlinks = extract_simple(&extractor(true), &links, false, &counters);

        assert!(outlinks.is_empty());
        assert!(counters.snapshot().values().all(|&count| count == 0));
    }

    #[test]
    fn test_unresolvable_href_counted() {
        let counters = EventCounter::new();
        let links = vec![
            RawLink::new("http://[broken/", "bad", false),
            RawLink::new("/ok", "ok", false),
        ];
        let outlinks = extract_simple(&extractor(true), &links, false, &counters);

        assert_eq!(targets(&outlinks), vec!["http://a.com/ok"]);
        assert_eq!(counters.get("error_outlink_parsing"), 1);
    }

    #[test]
    fn test_invalid_parent_url() {
        let counters = EventCounter::new();
        let links = vec![RawLink::new("/ok", "ok", false)];
        let outlinks =
            extractor(true).extract("not a url", &Metadata::new(), None, &links, false, &counters);

        assert!(outlinks.is_empty());
        assert_eq!(counters.get("error_invalid_source_url"), 1);
    }

    #[test]
    fn test_strict_link_level_nofollow_dropped() {
        let counters = EventCounter::new();
        let links = vec![
            RawLink::new("/a", "A", true),
            RawLink::new("/b", "B", false),
        ];
        let outlinks = extract_simple(&extractor(true), &links, false, &counters);

        assert_eq!(targets(&outlinks), vec!["http://a.com/b"]);
        assert_eq!(counters.get("outlink_nofollow"), 1);
    }

    #[test]
    fn test_strict_page_level_nofollow_drops_every_link() {
        let counters = EventCounter::new();
        let links = vec![
            RawLink::new("/a", "A", false),
            RawLink::new("/b", "B", true),
        ];
        let outlinks = extract_simple(&extractor(true), &links, true, &counters);

        assert!(outlinks.is_empty());
        assert_eq!(counters.get("outlink_nofollow"), 2);
    }

    #[test]
    fn test_lenient_nofollow_kept_without_anchor() {
        let counters = EventCounter::new();
        let links = vec![
            RawLink::new("/a", "Hidden", true),
            RawLink::new("/a", "Visible", false),
        ];
        let outlinks = extract_simple(&extractor(false), &links, false, &counters);

        assert_eq!(targets(&outlinks), vec!["http://a.com/a"]);
        assert_eq!(outlinks[0].anchor.as_deref(), Some("Visible"));
        assert_eq!(
            outlinks[0].metadata.values(ANCHORS_KEY),
            &["Visible".to_string()]
        );
    }

    #[test]
    fn test_filtered_links_counted() {
        let counters = EventCounter::new();
        let filters = UrlFilters::new(vec![
            Box::new(BasicNormalizer::default()),
            Box::new(HostDenyFilter::new(vec!["*.spam.com".to_string()])),
        ]);
        let extractor = OutlinkExtractor::new(filters, MetadataTransfer::default(), true, true);
        let links = vec![
            RawLink::new("http://www.spam.com/", "spam", false),
            RawLink::new("mailto:someone@a.com", "mail", false),
            RawLink::new("/fine", "fine", false),
        ];
        let outlinks = extract_simple(&extractor, &links, false, &counters);

        assert_eq!(targets(&outlinks), vec!["http://a.com/fine"]);
        assert_eq!(counters.get("outlink_filtered"), 2);
    }

    #[test]
    fn test_anchor_tracking_disabled() {
        let counters = EventCounter::new();
        let links = vec![RawLink::new("/a", "A", false)];
        let extractor = normalizing_extractor(false, true);
        let outlinks = extract_simple(&extractor, &links, false, &counters);

        assert_eq!(outlinks[0].anchor, None);
        assert!(!outlinks[0].metadata.contains_key(ANCHORS_KEY));
    }

    #[test]
    fn test_metadata_inherited() {
        let counters = EventCounter::new();
        let parent: Metadata = [("depth", "2")].into_iter().collect();
        let links = vec![RawLink::new("/a", "A", false)];
        let outlinks =
            extractor(true).extract("http://a.com/", &parent, None, &links, false, &counters);

        assert_eq!(outlinks[0].metadata.first_value("depth"), Some("3"));
        assert_eq!(
            outlinks[0].metadata.values("url.path"),
            &["http://a.com/".to_string()]
        );
        assert_eq!(parent.first_value("depth"), Some("2"));
    }

    #[test]
    fn test_emit_outlinks_disabled_skips_filters() {
        let mut config = Config::default();
        config.parser.emit_outlinks = false;
        let extractor = OutlinkExtractor::from_config(&config).unwrap();
        let counters = EventCounter::new();
        let links = vec![RawLink::new("/a#frag", "A", false)];
        let outlinks = extract_simple(&extractor, &links, false, &counters);

        assert_eq!(targets(&outlinks), vec!["http://a.com/a#frag"]);
    }
}
