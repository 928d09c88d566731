//! Robots directives from the `X-Robots-Tag` header and `<meta name="robots">`

use crate::metadata::Metadata;

/// Header carrying robots directives, looked up ignoring case
pub const ROBOTS_HEADER: &str = "X-Robots-Tag";

pub const NO_INDEX_KEY: &str = "robots.noIndex";
pub const NO_FOLLOW_KEY: &str = "robots.noFollow";
pub const NO_CACHE_KEY: &str = "robots.noCache";

/// Page-level robots directives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RobotsTags {
    pub no_index: bool,
    pub no_follow: bool,
    pub no_cache: bool,
}

impl RobotsTags {
    /// Reads directives from the response headers stored in `metadata`
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mut tags = Self::default();
        for value in metadata.values_ignore_case(ROBOTS_HEADER) {
            tags.add_directives(value);
        }
        tags
    }

    /// Merges a comma-separated directive list such as `"noindex, nofollow"`
    ///
    /// Directives only ever get switched on; unknown tokens are ignored.
    pub fn add_directives(&mut self, value: &str) {
        for token in value.split(',').map(|t| t.trim().to_ascii_lowercase()) {
            match token.as_str() {
                "none" => {
                    self.no_index = true;
                    self.no_follow = true;
                }
                "noindex" => self.no_index = true,
                "nofollow" => self.no_follow = true,
                "noarchive" | "nocache" => self.no_cache = true,
                _ => {}
            }
        }
    }

    /// Writes the active directives to `metadata` as `"true"` flags
    pub fn write_to(&self, metadata: &mut Metadata) {
        if self.no_index {
            metadata.set_value(NO_INDEX_KEY, "true");
        }
        if self.no_follow {
            metadata.set_value(NO_FOLLOW_KEY, "true");
        }
        if self.no_cache {
            metadata.set_value(NO_CACHE_KEY, "true");
        }
    }
}
