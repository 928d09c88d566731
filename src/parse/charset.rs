//! Charset detection and decoding
//!
//! Detection never fails: when nothing better is known the detector settles on
//! UTF-8 for valid UTF-8 input and windows-1252 otherwise. Labels are resolved
//! with `encoding_rs`, so every name returned is a WHATWG encoding name.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Number of leading bytes inspected for `<meta>` charset declarations
const SNIFF_LIMIT: usize = 1024;

/// Best-effort charset detection
pub trait CharsetDetector: Send + Sync {
    /// Picks the charset to decode `content` with
    ///
    /// # Arguments
    ///
    /// * `content` - Raw document bytes
    /// * `declared` - Charset declared by the transport, if any
    fn detect(&self, content: &[u8], declared: Option<&str>) -> String;
}

/// Detector combining byte-order marks, transport hints and `<meta>` sniffing
///
/// Precedence: byte-order mark, declared charset, `<meta>` declaration,
/// then UTF-8 validity. Unknown labels are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingCharsetDetector;

impl CharsetDetector for SniffingCharsetDetector {
    fn detect(&self, content: &[u8], declared: Option<&str>) -> String {
        if let Some((encoding, _)) = Encoding::for_bom(content) {
            return encoding.name().to_string();
        }

        if let Some(encoding) = declared.and_then(encoding_for_label) {
            return encoding.name().to_string();
        }

        let head = &content[..content.len().min(SNIFF_LIMIT)];
        if let Some(encoding) = sniff_meta(head).as_deref().and_then(encoding_for_label) {
            tracing::trace!("Charset {} declared in <meta>", encoding.name());
            return encoding.name().to_string();
        }

        if std::str::from_utf8(content).is_ok() {
            UTF_8.name().to_string()
        } else {
            WINDOWS_1252.name().to_string()
        }
    }
}

/// Extracts the `charset=` parameter of a Content-Type value
///
/// # Examples
///
/// ```
/// use ripple_parse::parse::charset_from_content_type;
///
/// assert_eq!(
///     charset_from_content_type("text/html; charset=\"ISO-8859-1\""),
///     Some("ISO-8859-1".to_string())
/// );
/// assert_eq!(charset_from_content_type("text/html"), None);
/// ```
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

/// Decodes `content` with `charset`
///
/// A byte-order mark overrides `charset`. Unknown labels decode as UTF-8;
/// malformed sequences become U+FFFD.
pub fn decode(content: &[u8], charset: &str) -> String {
    let encoding = encoding_for_label(charset).unwrap_or(UTF_8);
    let (text, actual, had_errors) = encoding.decode(content);
    if had_errors {
        tracing::debug!("Malformed {} sequences replaced while decoding", actual.name());
    }
    text.into_owned()
}

fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Finds `charset=` inside the first `<meta>` tag that declares one
fn sniff_meta(head: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    let mut rest = text.as_str();

    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let tag = &tag[..tag.find('>').unwrap_or(tag.len())];

        if let Some(pos) = tag.find("charset") {
            let value = tag[pos + "charset".len()..].trim_start();
            if let Some(value) = value.strip_prefix('=') {
                let value = value
                    .trim_start()
                    .trim_start_matches(|c| c == '"' || c == '\'');
                let end = value
                    .find(|c: char| {
                        !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
                    })
                    .unwrap_or(value.len());
                if end > 0 {
                    return Some(value[..end].to_string());
                }
            }
        }

        rest = &rest[start + "<meta".len()..];
    }

    None
}
