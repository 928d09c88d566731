use serde::Deserialize;

/// Main configuration structure for Ripple-Parse
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Ordered URL filter chain applied to every outlink
    #[serde(rename = "url-filters", default = "default_url_filters")]
    pub url_filters: Vec<FilterEntry>,

    /// Ordered content filters applied after parsing
    #[serde(rename = "parse-filters", default)]
    pub parse_filters: Vec<FilterEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            parser: ParserConfig::default(),
            metadata: MetadataConfig::default(),
            dispatcher: DispatcherConfig::default(),
            url_filters: default_url_filters(),
            parse_filters: Vec::new(),
        }
    }
}

/// Canonicalization toggles
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Strip the `#fragment` part
    #[serde(rename = "remove-anchor-part")]
    pub remove_anchor_part: bool,

    /// Repair `host&a=b` into `host?a=b`
    #[serde(rename = "unmangle-query-string")]
    pub unmangle_query_string: bool,

    /// Query parameter names dropped from every URL
    #[serde(rename = "query-elements-to-remove")]
    pub query_elements_to_remove: Vec<String>,

    /// Apply generic URI syntax checks and dot-segment removal
    #[serde(rename = "check-valid-uri")]
    pub check_valid_uri: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            remove_anchor_part: true,
            unmangle_query_string: true,
            query_elements_to_remove: Vec::new(),
            check_valid_uri: true,
        }
    }
}

/// Document processing toggles
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Send surviving outlinks to the status stream as discovered
    #[serde(rename = "emit-outlinks")]
    pub emit_outlinks: bool,

    /// Record anchor texts in outlink metadata
    #[serde(rename = "track-anchors")]
    pub track_anchors: bool,

    /// Drop no-follow links entirely instead of only ignoring their anchors
    #[serde(rename = "robots-no-follow-strict")]
    pub robots_no_follow_strict: bool,

    /// Report non-HTML documents as errors instead of passing them on
    #[serde(rename = "treat-non-html-as-error")]
    pub treat_non_html_as_error: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            emit_outlinks: true,
            track_anchors: true,
            robots_no_follow_strict: true,
            treat_non_html_as_error: true,
        }
    }
}

/// Which parent metadata is inherited by outlinks
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Keys copied verbatim from the parent
    pub transfer: Vec<String>,

    /// Maintain the `url.path` chain
    #[serde(rename = "track-path")]
    pub track_path: bool,

    /// Maintain the `depth` counter
    #[serde(rename = "track-depth")]
    pub track_depth: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            transfer: Vec::new(),
            track_path: true,
            track_depth: true,
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Maximum number of documents processed at once
    pub workers: u32,

    /// Capacity of the work item queue
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
        }
    }
}

/// A filter stage referenced by its registered identifier
#[derive(Debug, Clone, Deserialize)]
pub struct FilterEntry {
    /// Registry identifier (e.g., "basic-normalizer")
    pub id: String,

    /// Stage-specific parameters
    #[serde(flatten)]
    pub params: toml::Table,
}

impl FilterEntry {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            params: toml::Table::new(),
        }
    }

    /// Reads a string array parameter, empty when absent
    pub fn string_list(&self, key: &str) -> Vec<String> {
        self.params
            .get(key)
            .and_then(toml::Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn default_url_filters() -> Vec<FilterEntry> {
    vec![FilterEntry::new("basic-normalizer")]
}
