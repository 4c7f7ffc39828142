//! Resource extraction from HTML documents and CSS text
//!
//! Extraction is driven by a fixed rule table. Each rule pairs a CSS
//! selector with either an attribute or the element text, and tags what it
//! finds with a resource kind and origin.
//!
//! # Rule Table
//!
//! | kind  | origin      | source |
//! |-------|-------------|--------|
//! | media | link        | `src` of img, audio, video, source, embed; `data` of object |
//! | css   | link        | `href` of `link[rel=stylesheet]` |
//! | css   | inline code | `style` element text, `style` attributes |
//! | js    | link        | `src` of script |
//! | js    | inline code | `script` element text |
//! | page  | link        | `src` of iframe; `href` of a, area, other `link` elements |
//!
//! Missing or empty attributes simply produce nothing.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// What a discovered resource is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Media,
    Css,
    Js,
    Page,
}

/// Whether a resource is a reference or embedded code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOrigin {
    Link,
    InlineCode,
}

/// A reference or code snippet found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub origin: ResourceOrigin,
    /// URL as written in the document, or the code snippet
    pub value: String,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Attribute(&'static str),
    Text,
}

struct ExtractionRule {
    selector: Selector,
    target: Target,
    kind: ResourceKind,
    origin: ResourceOrigin,
}

impl ExtractionRule {
    fn extract(&self, element: ElementRef<'_>) -> Option<Resource> {
        let value = match self.target {
            Target::Attribute(name) => element.value().attr(name)?.trim().to_string(),
            Target::Text => element.text().collect::<String>(),
        };
        if value.trim().is_empty() {
            return None;
        }
        Some(Resource {
            kind: self.kind,
            origin: self.origin,
            value,
        })
    }
}

const RULE_TABLE: &[(&str, Target, ResourceKind, ResourceOrigin)] = &[
    ("img[src]", Target::Attribute("src"), ResourceKind::Media, ResourceOrigin::Link),
    ("audio[src]", Target::Attribute("src"), ResourceKind::Media, ResourceOrigin::Link),
    ("video[src]", Target::Attribute("src"), ResourceKind::Media, ResourceOrigin::Link),
    ("source[src]", Target::Attribute("src"), ResourceKind::Media, ResourceOrigin::Link),
    ("embed[src]", Target::Attribute("src"), ResourceKind::Media, ResourceOrigin::Link),
    ("object[data]", Target::Attribute("data"), ResourceKind::Media, ResourceOrigin::Link),
    (
        "link[rel~=\"stylesheet\"][href]",
        Target::Attribute("href"),
        ResourceKind::Css,
        ResourceOrigin::Link,
    ),
    ("style", Target::Text, ResourceKind::Css, ResourceOrigin::InlineCode),
    ("[style]", Target::Attribute("style"), ResourceKind::Css, ResourceOrigin::InlineCode),
    ("script[src]", Target::Attribute("src"), ResourceKind::Js, ResourceOrigin::Link),
    ("script", Target::Text, ResourceKind::Js, ResourceOrigin::InlineCode),
    ("iframe[src]", Target::Attribute("src"), ResourceKind::Page, ResourceOrigin::Link),
    ("a[href]", Target::Attribute("href"), ResourceKind::Page, ResourceOrigin::Link),
    ("area[href]", Target::Attribute("href"), ResourceKind::Page, ResourceOrigin::Link),
    (
        "link[href]:not([rel~=\"stylesheet\"])",
        Target::Attribute("href"),
        ResourceKind::Page,
        ResourceOrigin::Link,
    ),
];

#[allow(clippy::expect_used)]
static EXTRACTION_RULES: LazyLock<Vec<ExtractionRule>> = LazyLock::new(|| {
    RULE_TABLE
        .iter()
        .map(|&(selector, target, kind, origin)| ExtractionRule {
            selector: Selector::parse(selector).expect("extraction selector must be valid"),
            target,
            kind,
            origin,
        })
        .collect()
});

#[allow(clippy::expect_used)]
static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*['"]?(.*?)['"]?\s*\)"#).expect("CSS url() pattern must be valid")
});

/// Walks the rule table over a parsed document
///
/// Resources are produced lazily, rule by rule, in document order within
/// each rule.
pub fn extract_resources(document: &Html) -> impl Iterator<Item = Resource> + '_ {
    EXTRACTION_RULES.iter().flat_map(move |rule| {
        document
            .select(&rule.selector)
            .filter_map(move |element| rule.extract(element))
    })
}

/// Finds every `url(...)` reference in CSS text, yielded as media links
///
/// `data:` URIs are skipped.
pub fn extract_css_urls(css: &str) -> impl Iterator<Item = Resource> + '_ {
    CSS_URL
        .captures_iter(css)
        .filter_map(|captures| captures.get(1))
        .map(|found| found.as_str().trim())
        .filter(|value| !value.is_empty() && !value.to_ascii_lowercase().starts_with("data:"))
        .map(|value| Resource {
            kind: ResourceKind::Media,
            origin: ResourceOrigin::Link,
            value: value.to_string(),
        })
}
