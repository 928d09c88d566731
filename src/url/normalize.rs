use crate::config::NormalizerConfig;
use crate::metadata::Metadata;
use crate::url::escape::{escape_path, unescape_path, uppercase_triplets};
use crate::url::filters::UrlFilter;
use crate::url::parts::{assemble, UrlParts};
use crate::{UrlError, UrlResult};
use std::collections::BTreeSet;
use url::{form_urlencoded, Url};

/// Schemes a canonical URL may carry
const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "ftp", "file"];

/// Schemes that must name a host
const NETWORK_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// The canonicalizer: maps a raw URL string to its canonical form
///
/// # Normalization Steps
///
/// Each optional step is controlled by [`NormalizerConfig`]; the order is fixed.
///
/// 1. Trim surrounding whitespace and control characters
/// 2. Remove the `#fragment` (optional); the URL must parse
/// 3. Repair `host&a=b` into `host?a=b` (optional)
/// 4. Drop configured query parameters and sort the rest by name (optional)
/// 5. Lowercase scheme and host; decode percent-encoded unreserved characters
///    and re-encode controls, non-ASCII bytes and `[`/`]` in path and query.
///    The string is only rebuilt if one of those changed.
/// 6. Check generic URI syntax, uppercase percent triplets and remove dot
///    segments from the path (optional)
///
/// Applying the canonicalizer to its own output returns that output unchanged.
///
/// # Examples
///
/// ```
/// use ripple_parse::config::NormalizerConfig;
/// use ripple_parse::url::BasicNormalizer;
///
/// let normalizer = BasicNormalizer::new(&NormalizerConfig::default());
/// let url = normalizer.normalize("HTTP://Example.COM/a/./b/%7Euser#top").unwrap();
/// assert_eq!(url, "http://example.com/a/b/~user");
/// ```
#[derive(Debug, Clone)]
pub struct BasicNormalizer {
    remove_anchor_part: bool,
    unmangle_query_string: bool,
    query_elements_to_remove: BTreeSet<String>,
    check_valid_uri: bool,
}

impl BasicNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            remove_anchor_part: config.remove_anchor_part,
            unmangle_query_string: config.unmangle_query_string,
            query_elements_to_remove: config.query_elements_to_remove.iter().cloned().collect(),
            check_valid_uri: config.check_valid_uri,
        }
    }

    /// Canonicalizes a single candidate URL
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The canonical URL
    /// * `Err(UrlError)` - The candidate has no canonical form
    pub fn normalize(&self, candidate: &str) -> UrlResult<String> {
        let mut url = candidate.trim_matches(|c: char| c <= ' ').to_string();

        if self.remove_anchor_part {
            parse_supported(&url)?;
            if let Some(hash) = url.find('#') {
                url.truncate(hash);
            }
        }

        if self.unmangle_query_string {
            url = unmangle_query_string(&url);
        }

        if !self.query_elements_to_remove.is_empty() {
            url = self.filter_query_elements(&url)?;
        }

        url = normalize_structure(&url)?;

        if self.check_valid_uri {
            url = normalize_uri(&url).map_err(|e| {
                tracing::info!("Invalid URI {}", url);
                e
            })?;
        }

        Ok(url)
    }

    /// Removes configured query parameters and sorts the remaining ones by name
    ///
    /// Parameters sharing a name keep their relative order.
    fn filter_query_elements(&self, url: &str) -> UrlResult<String> {
        parse_supported(url)?;
        let parts = split(url)?;

        let query = match parts.query {
            Some(query) if !query.is_empty() => query,
            _ => return Ok(url.to_string()),
        };

        let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .filter(|(name, _)| !self.query_elements_to_remove.contains(name))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let new_query = if pairs.is_empty() {
            None
        } else {
            Some(
                form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter())
                    .finish(),
            )
        };

        Ok(assemble(
            parts.scheme,
            parts.authority,
            parts.path,
            new_query.as_deref(),
            parts.fragment,
        ))
    }
}

impl Default for BasicNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl UrlFilter for BasicNormalizer {
    fn name(&self) -> &str {
        "basic-normalizer"
    }

    fn filter(
        &self,
        _source_url: &Url,
        _source_metadata: &Metadata,
        candidate: &str,
    ) -> Option<String> {
        match self.normalize(candidate) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!("No canonical form for {}: {}", candidate, e);
                None
            }
        }
    }
}

/// Parses the URL and checks that its scheme is one we canonicalize
fn parse_supported(url: &str) -> UrlResult<Url> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
    if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }
    Ok(parsed)
}

fn split(url: &str) -> UrlResult<UrlParts<'_>> {
    UrlParts::split(url).ok_or_else(|| UrlError::Malformed(url.to_string()))
}

/// A common error is a query string starting with `&` instead of `?`
///
/// `http://foo.com&a=b` becomes `http://foo.com?a=b`. Only an `&` that comes
/// before any `?` and before any `#` is replaced.
fn unmangle_query_string(url: &str) -> String {
    let amp = match url.find('&') {
        Some(amp) if amp > 0 => amp,
        _ => return url.to_string(),
    };
    let before_question = url.find('?').map_or(true, |question| amp < question);
    let before_hash = url.find('#').map_or(true, |hash| amp < hash);
    if !(before_question && before_hash) {
        return url.to_string();
    }

    let mut fixed = url.to_string();
    fixed.replace_range(amp..amp + 1, "?");
    fixed
}

/// Lowercases scheme and host and normalizes percent-encoding of path and query
fn normalize_structure(url: &str) -> UrlResult<String> {
    parse_supported(url)?;
    let parts = split(url)?;

    let scheme = parts.scheme.to_ascii_lowercase();
    let mut changed = scheme != parts.scheme;

    if NETWORK_SCHEMES.contains(&scheme.as_str())
        && parts.host_port().map_or(true, |host| host.is_empty())
    {
        return Err(UrlError::Malformed(format!("missing host in {}", url)));
    }

    let authority = parts.authority.map(lowercase_host);
    changed |= authority.as_deref() != parts.authority;

    let path = escape_path(&unescape_path(parts.path));
    let query = parts.query.map(|query| escape_path(&unescape_path(query)));
    changed |= path != parts.path || query.as_deref() != parts.query;

    if !changed {
        return Ok(url.to_string());
    }

    Ok(assemble(
        &scheme,
        authority.as_deref(),
        &path,
        query.as_deref(),
        parts.fragment,
    ))
}

/// Lowercases the host and port of an authority, leaving userinfo untouched
fn lowercase_host(authority: &str) -> String {
    match authority.rsplit_once('@') {
        Some((userinfo, host_port)) => format!("{}@{}", userinfo, host_port.to_lowercase()),
        None => authority.to_lowercase(),
    }
}

/// Applies generic URI syntax checks and normalization
fn normalize_uri(url: &str) -> UrlResult<String> {
    if let Some(bad) = url.chars().find(|c| !is_uri_char(*c)) {
        return Err(UrlError::InvalidUri(format!(
            "illegal character {:?} in {}",
            bad, url
        )));
    }

    let upper = uppercase_triplets(url)
        .ok_or_else(|| UrlError::InvalidUri(format!("malformed escape in {}", url)))?;
    let parts = split(&upper)?;

    if parts.fragment.is_some_and(|fragment| fragment.contains('#')) {
        return Err(UrlError::InvalidUri(format!("multiple fragments in {}", url)));
    }

    let mut path = if parts.authority.is_some() || parts.path.starts_with('/') {
        remove_dot_segments(parts.path)
    } else {
        parts.path.to_string()
    };

    // without an authority a leading "//" would be read back as one
    if parts.authority.is_none() && path.starts_with("//") {
        path.insert_str(0, "/.");
    }

    Ok(assemble(
        parts.scheme,
        parts.authority,
        &path,
        parts.query,
        parts.fragment,
    ))
}

/// Characters allowed anywhere in a URI (RFC 3986 §2), plus IDN letters
fn is_uri_char(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_alphanumeric() || "-._~:/?#[]@!$&'()*+,;=%".contains(c)
    } else {
        c.is_alphanumeric()
    }
}

/// Removes `.` and `..` segments (RFC 3986 §5.2.4)
fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::with_capacity(path.len());

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_last_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_last_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..].find('/').map_or(input.len(), |i| i + start);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }

    output
}

fn pop_last_segment(output: &mut String) {
    match output.rfind('/') {
        Some(slash) => output.truncate(slash),
        None => output.clear(),
    }
}
