//! Crawl tasks and the response handler chosen for each

use crate::crawler::extract::ResourceKind;
use crate::url::host_key;
use std::fmt;
use url::Url;

/// How a completed response is processed after it has been archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// HTML is parsed for resources; anything else is treated as media
    Page,
    /// `url(...)` references are extracted from the stylesheet
    Css,
    /// Archived only
    Js,
    /// Archived only
    Media,
}

impl HandlerKind {
    /// Picks the handler for a resource discovered through a link
    pub fn for_resource(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Page => Self::Page,
            ResourceKind::Css => Self::Css,
            ResourceKind::Js => Self::Js,
            ResourceKind::Media => Self::Media,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Css => "css",
            Self::Js => "js",
            Self::Media => "media",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled fetch
///
/// Tasks are created when a seed or an admitted resource is scheduled and
/// are dropped once their fetch completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Absolute, fragment-free URL to fetch
    pub url: Url,

    /// Page hops from the seed this task descends from
    pub depth: u32,

    /// URL of the page (or redirecting response) that led here
    pub origin: Url,

    /// Processing applied to the response
    pub handler: HandlerKind,

    /// Number of redirects followed to reach this URL
    pub redirect_hops: u32,
}

impl CrawlTask {
    /// A seed: depth 0, parsed as a page
    pub fn seed(url: Url) -> Self {
        Self {
            origin: url.clone(),
            url,
            depth: 0,
            handler: HandlerKind::Page,
            redirect_hops: 0,
        }
    }

    /// A resource discovered while processing `self`
    pub fn discovered(&self, url: Url, depth: u32, handler: HandlerKind) -> Self {
        Self {
            url,
            depth,
            origin: self.url.clone(),
            handler,
            redirect_hops: 0,
        }
    }

    /// The follow-up fetch for a redirect answered to `self`
    ///
    /// Depth and handler carry over unchanged.
    pub fn redirect_to(&self, url: Url) -> Self {
        Self {
            url,
            depth: self.depth,
            origin: self.url.clone(),
            handler: self.handler,
            redirect_hops: self.redirect_hops + 1,
        }
    }

    /// Key of the host this task is fetched from
    pub fn host_key(&self) -> String {
        host_key(&self.url).unwrap_or_default()
    }
}
