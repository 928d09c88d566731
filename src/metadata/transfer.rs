//! Metadata inheritance from a parent document to its outlinks

use crate::config::MetadataConfig;
use crate::metadata::Metadata;

/// Key holding the chain of URLs that led to a document
pub const URL_PATH_KEY: &str = "url.path";

/// Key holding the number of hops from the seed
pub const DEPTH_KEY: &str = "depth";

/// Decides which parent metadata an outlink inherits
///
/// The set of transferred keys is fixed at startup. Every call returns a
/// freshly allocated `Metadata`; nothing is shared with the parent.
#[derive(Debug, Clone)]
pub struct MetadataTransfer {
    keys: Vec<String>,
    track_path: bool,
    track_depth: bool,
}

impl MetadataTransfer {
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            keys: config.transfer.clone(),
            track_path: config.track_path,
            track_depth: config.track_depth,
        }
    }

    /// Builds the metadata of an outlink discovered on `source_url`
    ///
    /// # Arguments
    ///
    /// * `target_url` - Canonical URL of the outlink
    /// * `source_url` - URL of the document the link was found on
    /// * `parent` - Metadata of that document
    pub fn for_outlink(&self, target_url: &str, source_url: &str, parent: &Metadata) -> Metadata {
        let mut child = Metadata::new();

        for key in &self.keys {
            let values = parent.values(key);
            if !values.is_empty() {
                child.set_values(key.as_str(), values.iter().cloned());
            }
        }

        if self.track_path {
            let mut path: Vec<String> = parent.values(URL_PATH_KEY).to_vec();
            path.push(source_url.to_string());
            child.set_values(URL_PATH_KEY, path);
        }

        if self.track_depth {
            let depth = match parent.first_value(DEPTH_KEY) {
                Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|_| {
                    tracing::debug!("Ignoring non-numeric depth '{}' on {}", raw, source_url);
                    0
                }),
                None => 0,
            };
            child.set_value(DEPTH_KEY, depth.saturating_add(1).to_string());
        }

        tracing::trace!(
            "Outlink {} inherits {} metadata keys from {}",
            target_url,
            child.len(),
            source_url
        );

        child
    }
}

impl Default for MetadataTransfer {
    fn default() -> Self {
        Self::new(&MetadataConfig::default())
    }
}
