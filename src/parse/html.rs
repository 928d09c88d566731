//! HTML content parser
//!
//! This module handles parsing HTML content to extract:
//! - Links (from `<a href>` tags) with their anchor text and `rel` flags
//! - The `<base href>` links are resolved against
//! - Robots directives from `<meta name="robots">`
//! - The visible body text

use crate::parse::charset::decode;
use crate::parse::RawLink;
use crate::ParseFailure;
use scraper::{ElementRef, Html, Selector};

/// Elements whose text is never part of the extracted body text
const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Output of a content parser
#[derive(Debug)]
pub struct ParsedContent {
    /// The document tree, handed to content filters
    pub document: Html,

    /// Links in document order, hrefs as written
    pub links: Vec<RawLink>,

    /// `href` of the first `<base>` element, as written
    pub base_href: Option<String>,

    /// `content` values of every `<meta name="robots">` tag
    pub robots_meta: Vec<String>,

    /// Whitespace-normalised body text
    pub text: String,
}

/// Turns document bytes into links, robots directives and text
pub trait ContentParser: Send + Sync {
    /// Parses `content` decoded with `charset`
    ///
    /// # Returns
    ///
    /// * `Ok(ParsedContent)` - Successfully parsed document
    /// * `Err(ParseFailure)` - The document could not be parsed
    fn parse(&self, content: &[u8], charset: &str) -> Result<ParsedContent, ParseFailure>;
}

/// Parser backed by `scraper`
///
/// Never resolves links: hrefs are returned exactly as written so that the
/// outlink extractor resolves them against the document URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl ContentParser for HtmlParser {
    fn parse(&self, content: &[u8], charset: &str) -> Result<ParsedContent, ParseFailure> {
        let html = decode(content, charset);
        let document = Html::parse_document(&html);

        let links = extract_links(&document)?;
        let base_href = extract_base_href(&document)?;
        let robots_meta = extract_robots_meta(&document)?;
        let text = extract_text(&document)?;

        Ok(ParsedContent {
            document,
            links,
            base_href,
            robots_meta,
            text,
        })
    }
}

fn selector(css: &str) -> Result<Selector, ParseFailure> {
    Selector::parse(css).map_err(|e| ParseFailure(format!("invalid selector '{}': {:?}", css, e)))
}

/// Collapses runs of whitespace into single spaces
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts every `<a href>` in document order
fn extract_links(document: &Html) -> Result<Vec<RawLink>, ParseFailure> {
    let a_selector = selector("a[href]")?;

    let links = document
        .select(&a_selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let anchor = normalize_whitespace(&element.text().collect::<String>());
            let no_follow = element
                .value()
                .attr("rel")
                .map(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("nofollow"))
                })
                .unwrap_or(false);
            Some(RawLink::new(href, anchor, no_follow))
        })
        .collect();

    Ok(links)
}

fn extract_base_href(document: &Html) -> Result<Option<String>, ParseFailure> {
    let base_selector = selector("base[href]")?;

    Ok(document
        .select(&base_selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string))
}

fn extract_robots_meta(document: &Html) -> Result<Vec<String>, ParseFailure> {
    let meta_selector = selector("meta[name][content]")?;

    Ok(document
        .select(&meta_selector)
        .filter(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("robots"))
        })
        .filter_map(|element| element.value().attr("content").map(str::to_string))
        .collect())
}

fn extract_text(document: &Html) -> Result<String, ParseFailure> {
    let body_selector = selector("body")?;
    let root = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut text = String::new();
    collect_text(root, &mut text);
    Ok(normalize_whitespace(&text))
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !NON_TEXT_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        }
    }
}
