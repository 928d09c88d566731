//! Percent-encoding normalization for URL paths
//!
//! Both lookup tables are computed at compile time.

/// Bytes that must never stay percent-encoded (RFC 3986 §2.3 unreserved)
static UNRESERVED: [bool; 256] = build_unreserved();

/// Bytes that must always be percent-encoded in a path
static MUST_ESCAPE: [bool; 256] = build_must_escape();

const fn build_unreserved() -> [bool; 256] {
    let mut table = [false; 256];
    let mut c = 0;
    while c < 256 {
        let b = c as u8;
        table[c] = b.is_ascii_alphanumeric() || b == b'-' || b == b'.' || b == b'_' || b == b'~';
        c += 1;
    }
    table
}

const fn build_must_escape() -> [bool; 256] {
    let mut table = [false; 256];
    let mut c = 0;
    while c < 256 {
        // Controls, space, DEL and every non-ASCII byte, plus the IPv6 brackets
        table[c] = c < 33 || c >= 0x7F || c == b'[' as usize || c == b']' as usize;
        c += 1;
    }
    table
}

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Decodes percent-encoded unreserved characters and uppercases the rest
///
/// `%7e` becomes `~`, `%5b` becomes `%5B`. Malformed triplets are copied as-is.
/// Decoding repeats until nothing changes, so a triplet assembled by an earlier
/// pass (`%%34%31` gives `%41`) is decoded too.
pub(crate) fn unescape_path(path: &str) -> String {
    let mut current = unescape_once(path);
    loop {
        let next = unescape_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn unescape_once(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push_str(&path[literal_start..i]);
                let decoded = hi << 4 | lo;
                if UNRESERVED[decoded as usize] {
                    out.push(decoded as char);
                } else {
                    out.push('%');
                    out.push(HEX_UPPER[hi as usize] as char);
                    out.push(HEX_UPPER[lo as usize] as char);
                }
                i += 3;
                literal_start = i;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&path[literal_start..]);
    out
}

/// Percent-encodes control bytes, space, non-ASCII bytes and `[`/`]`
///
/// Multi-byte UTF-8 characters are encoded byte by byte.
pub(crate) fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for &b in path.as_bytes() {
        if MUST_ESCAPE[b as usize] {
            out.push('%');
            out.push(HEX_UPPER[(b >> 4) as usize] as char);
            out.push(HEX_UPPER[(b & 0x0F) as usize] as char);
        } else {
            out.push(b as char);
        }
    }
    out
}

/// Uppercases the hex digits of every percent-encoded triplet
///
/// Returns `None` when a `%` is not followed by two hex digits.
pub(crate) fn uppercase_triplets(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_value)?;
            let lo = bytes.get(i + 2).copied().and_then(hex_value)?;
            out.push_str(&input[literal_start..i]);
            out.push('%');
            out.push(HEX_UPPER[hi as usize] as char);
            out.push(HEX_UPPER[lo as usize] as char);
            i += 3;
            literal_start = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&input[literal_start..]);
    Some(out)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_unreserved() {
        assert_eq!(unescape_path("/a%2Eb"), "/a.b");
        assert_eq!(unescape_path("/%7euser"), "/~user");
        assert_eq!(unescape_path("/%41%62%30"), "/Ab0");
        assert_eq!(unescape_path("/%2d%5f"), "/-_");
    }

    #[test]
    fn test_unescape_keeps_reserved_uppercased() {
        assert_eq!(unescape_path("/a%5bb"), "/a%5Bb");
        assert_eq!(unescape_path("/a%2fb"), "/a%2Fb");
        assert_eq!(unescape_path("/caf%c3%a9"), "/caf%C3%A9");
    }

    #[test]
    fn test_unescape_malformed_triplets() {
        assert_eq!(unescape_path("/100%"), "/100%");
        assert_eq!(unescape_path("/100%2"), "/100%2");
        assert_eq!(unescape_path("/%zz"), "/%zz");
        assert_eq!(unescape_path("/%%41"), "/%A");
    }

    #[test]
    fn test_unescape_decodes_assembled_triplets() {
        assert_eq!(unescape_path("/%%34%31"), "/A");
        assert_eq!(unescape_path("/%%37%65x"), "/~x");
        assert_eq!(unescape_path("/%%35%62"), "/%5B");
        assert_eq!(unescape_path("/%25%34%31"), "/%2541");

        let once = unescape_path("/%%%33%34%31");
        assert_eq!(once, "/A");
        assert_eq!(unescape_path(&once), once);
    }

    #[test]
    fn test_escape_controls_and_brackets() {
        assert_eq!(escape_path("/a b"), "/a%20b");
        assert_eq!(escape_path("/a[1]"), "/a%5B1%5D");
        assert_eq!(escape_path("/tab\there"), "/tab%09here");
        assert_eq!(escape_path("/del\u{7f}"), "/del%7F");
    }

    #[test]
    fn test_escape_non_ascii_as_utf8() {
        assert_eq!(escape_path("/café"), "/caf%C3%A9");
    }

    #[test]
    fn test_escape_leaves_other_ascii() {
        let path = "/a-b_c~d.e!$&'()*+,;=:@%41";
        assert_eq!(escape_path(path), path);
    }

    #[test]
    fn test_uppercase_triplets() {
        assert_eq!(
            uppercase_triplets("/a%5bb?q=%2f").as_deref(),
            Some("/a%5Bb?q=%2F")
        );
        assert_eq!(uppercase_triplets("/plain").as_deref(), Some("/plain"));
        assert!(uppercase_triplets("/bad%g1").is_none());
        assert!(uppercase_triplets("/trailing%").is_none());
    }
}
