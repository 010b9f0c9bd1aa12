//! HTML to readable text.
//!
//! Three strategies are tried in order and the first non-empty one wins:
//!
//! 1. paragraphs whose text is longer than `min_paragraph_chars`
//! 2. every text fragment under `<body>`
//! 3. every text fragment in the document
//!
//! Subtrees rooted at an ignored tag never contribute text to any of them.

use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;

use crate::config::ExtractionConfig;
use crate::errors::ConfigError;

/// Extracts readable text from HTML documents.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    ignore_tags: HashSet<String>,
    paragraph: Selector,
    body: Selector,
    min_paragraph_chars: usize,
    paragraph_separator: String,
    line_separator: String,
}

impl HtmlExtractor {
    /// Builds an extractor from configuration.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let paragraph = parse_selector(&config.paragraph_selector)?;
        let body = parse_selector("body")?;

        let mut ignore_tags = HashSet::with_capacity(config.ignore_tags.len());
        for tag in &config.ignore_tags {
            let tag = tag.trim().to_ascii_lowercase();
            if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(ConfigError::invalid_value(
                    "extraction.ignore_tags",
                    format!("'{tag}' is not a tag name"),
                ));
            }
            ignore_tags.insert(tag);
        }

        Ok(Self {
            ignore_tags,
            paragraph,
            body,
            min_paragraph_chars: config.min_paragraph_chars,
            paragraph_separator: config.paragraph_separator.clone(),
            line_separator: config.line_separator.clone(),
        })
    }

    /// Returns the readable text of `html`, or an empty string if there is none.
    ///
    /// Malformed markup is repaired by the parser, so this never fails.
    #[must_use]
    pub fn extract_text(&self, html: &str) -> String {
        let document = Html::parse_document(html);

        let paragraphs = self.paragraph_text(&document);
        if !paragraphs.is_empty() {
            return paragraphs;
        }

        if let Some(body) = document.select(&self.body).next() {
            let text = self.fragment_text(body);
            if !text.is_empty() {
                return text;
            }
        }

        self.fragment_text(document.root_element())
    }

    /// Whether `tag` is dropped together with its subtree.
    #[must_use]
    pub fn is_ignored(&self, tag: &str) -> bool {
        self.ignore_tags.contains(&tag.to_ascii_lowercase())
    }

    fn paragraph_text(&self, document: &Html) -> String {
        document
            .select(&self.paragraph)
            .filter(|p| !self.inside_ignored(*p))
            .map(|p| {
                let mut fragments = Vec::new();
                self.collect_text(p, &mut fragments);
                normalize_whitespace(&fragments.concat())
            })
            .filter(|text| text.chars().count() > self.min_paragraph_chars)
            .collect::<Vec<_>>()
            .join(&self.paragraph_separator)
    }

    fn fragment_text(&self, element: ElementRef<'_>) -> String {
        let mut fragments = Vec::new();
        self.collect_text(element, &mut fragments);
        fragments
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(&self.line_separator)
    }

    fn inside_ignored(&self, element: ElementRef<'_>) -> bool {
        self.is_ignored(element.value().name())
            || element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| self.is_ignored(a.value().name()))
    }

    /// Depth-first text walk that skips ignored subtrees.
    fn collect_text<'a>(&self, element: ElementRef<'a>, out: &mut Vec<&'a str>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => out.push(&**text),
                Node::Element(el) if self.is_ignored(el.name()) => {}
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.collect_text(child, out);
                    }
                }
                _ => {}
            }
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
