//! Raw component view of an absolute URL string
//!
//! `url::Url` re-serializes everything it parses. The canonicalizer only wants
//! to rewrite the components it actually normalizes, so it works on slices of
//! the original string split along the generic syntax of RFC 3986 appendix B.

/// Borrowed components of an absolute URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UrlParts<'a> {
    pub scheme: &'a str,
    /// Everything between `//` and the path, `None` when there is no `//`
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    /// Splits `input` into its components
    ///
    /// Returns `None` when the string does not start with a scheme.
    pub fn split(input: &'a str) -> Option<Self> {
        let colon = input.find(':')?;
        let scheme = &input[..colon];
        if !is_valid_scheme(scheme) {
            return None;
        }

        let rest = &input[colon + 1..];
        let (rest, fragment) = match rest.split_once('#') {
            Some((head, fragment)) => (head, Some(fragment)),
            None => (rest, None),
        };
        let (hier, query) = match rest.split_once('?') {
            Some((head, query)) => (head, Some(query)),
            None => (rest, None),
        };
        let (authority, path) = match hier.strip_prefix("//") {
            Some(after) => match after.find('/') {
                Some(slash) => (Some(&after[..slash]), &after[slash..]),
                None => (Some(after), ""),
            },
            None => (None, hier),
        };

        Some(Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        })
    }

    /// The host and port part of the authority, without any userinfo
    pub fn host_port(&self) -> Option<&'a str> {
        self.authority.map(|authority| match authority.rsplit_once('@') {
            Some((_, host_port)) => host_port,
            None => authority,
        })
    }
}

/// Reassembles a URL string from owned or borrowed components
pub(crate) fn assemble(
    scheme: &str,
    authority: Option<&str>,
    path: &str,
    query: Option<&str>,
    fragment: Option<&str>,
) -> String {
    let mut out = String::with_capacity(
        scheme.len()
            + authority.map_or(0, |a| a.len() + 2)
            + path.len()
            + query.map_or(0, |q| q.len() + 1)
            + fragment.map_or(0, |f| f.len() + 1)
            + 1,
    );
    out.push_str(scheme);
    out.push(':');
    if let Some(authority) = authority {
        out.push_str("//");
        out.push_str(authority);
    }
    out.push_str(path);
    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}
