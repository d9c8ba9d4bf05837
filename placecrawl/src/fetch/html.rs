//! HTML to [`PageDocument`] reduction.
//!
//! Visible text is every text node outside `script`, `style`, `noscript` and
//! `template`, concatenated in document order. The next-page link is the
//! first anchor whose text matches `next` (any case) or contains `>`; if no
//! anchor text matches, the first anchor directly inside `li.next` is used.
//! This is a site-specific heuristic: it also matches labels like
//! "Next steps".

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::models::PageDocument;
use crate::errors::{CrawlError, Result};

const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

const NEXT_TEXT_PATTERN: &str = r"(?i)next|>";
const NEXT_CONTAINER_SELECTOR: &str = "li.next > a";

/// Compiled rules for reducing a page to text and a next link.
#[derive(Debug, Clone)]
pub struct PageParser {
    anchors: Selector,
    next_container: Selector,
    next_text: Regex,
    blank_runs: Regex,
}

impl PageParser {
    /// Compiles the default rules.
    pub fn new() -> Result<Self> {
        Self::with_rules(NEXT_TEXT_PATTERN, NEXT_CONTAINER_SELECTOR)
    }

    /// Compiles custom next-link rules.
    pub fn with_rules(next_text_pattern: &str, next_container_selector: &str) -> Result<Self> {
        Ok(Self {
            anchors: parse_selector("a")?,
            next_container: parse_selector(next_container_selector)?,
            next_text: Regex::new(next_text_pattern)
                .map_err(|e| CrawlError::Config(format!("invalid next-link pattern: {e}")))?,
            blank_runs: Regex::new(r"\n\s*\n")
                .map_err(|e| CrawlError::Config(e.to_string()))?,
        })
    }

    /// Reduces an HTML document fetched from `page_url`.
    #[must_use]
    pub fn parse(&self, html: &str, page_url: &str) -> PageDocument {
        let document = Html::parse_document(html);
        let text = self.normalize_whitespace(&visible_text(&document));
        let next_url = self
            .find_next_href(&document)
            .and_then(|href| resolve_link(page_url, &href));

        PageDocument { text, next_url }
    }

    /// Trims the text and collapses every run of blank lines to one.
    #[must_use]
    pub fn normalize_whitespace(&self, text: &str) -> String {
        self.blank_runs.replace_all(text.trim(), "\n\n").into_owned()
    }

    /// Returns the raw href of the next-page anchor.
    ///
    /// `None` when no anchor matches, or when the matching anchor has no href.
    fn find_next_href(&self, document: &Html) -> Option<String> {
        let anchor = document
            .select(&self.anchors)
            .find(|a| self.next_text.is_match(&anchor_text(a)))
            .or_else(|| document.select(&self.next_container).next())?;

        anchor
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(String::from)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| CrawlError::Config(format!("invalid selector {selector:?}: {e}")))
}

fn anchor_text(anchor: &ElementRef<'_>) -> String {
    anchor.text().collect::<String>().trim().to_string()
}

fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

/// Resolves `href` against `base` into an absolute http(s) URL.
///
/// Relative paths, protocol-relative links and absolute links are handled
/// uniformly. Anything that does not resolve to http or https is dropped.
#[must_use]
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
