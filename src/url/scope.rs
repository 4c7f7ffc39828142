//! Allow-list matching for crawl scope
//!
//! An allow-list entry names a host and, optionally, a scheme and a path
//! prefix: `example.com`, `https://example.com`, `example.com/docs`.
//! A URL is in scope when it matches any entry; an empty list admits
//! everything.

use crate::ConfigError;
use std::fmt;
use url::Url;

/// A single parsed allow-list pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListEntry {
    scheme: Option<String>,
    host: String,
    port: Option<u16>,
    path_prefix: Option<String>,
}

impl AllowListEntry {
    /// Parses a pattern of the form `[scheme://]host[:port][/path]`
    ///
    /// Hosts are lowercased and a leading `www.` is dropped. A trailing slash
    /// on the path is ignored, and a path of `/` means "no prefix".
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let trimmed = pattern.trim();
        let (scheme, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => (Some(scheme.to_ascii_lowercase()), rest),
            None => (None, trimmed),
        };

        let (authority, path) = match rest.find('/') {
            Some(index) => (&rest[..index], &rest[index..]),
            None => (rest, ""),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPattern(pattern.to_string()))?;
                (host, Some(port))
            }
            None => (authority, None),
        };

        let host = normalize_host(host);
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidPattern(pattern.to_string()));
        }

        let path = path.trim_end_matches('/');
        let path_prefix = (!path.is_empty()).then(|| path.to_string());

        Ok(Self {
            scheme,
            host,
            port,
            path_prefix,
        })
    }

    /// Scheme given in the pattern, if any
    ///
    /// The scheme is recorded but does not narrow matching: `http://host`
    /// and `https://host` both admit either scheme.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path_prefix(&self) -> Option<&str> {
        self.path_prefix.as_deref()
    }

    /// Checks whether `url` falls under this entry
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if normalize_host(host) != self.host {
            return false;
        }

        if let Some(port) = self.port {
            if url.port_or_known_default() != Some(port) {
                return false;
            }
        }

        match &self.path_prefix {
            None => true,
            Some(prefix) => path_has_prefix(url.path(), prefix),
        }
    }
}

impl fmt::Display for AllowListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}://", scheme)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(prefix) = &self.path_prefix {
            write!(f, "{}", prefix)?;
        }
        Ok(())
    }
}

/// Ordered set of allow-list entries
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: Vec<AllowListEntry>,
}

impl AllowList {
    /// Builds an allow-list from raw patterns, failing on the first bad one
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let mut entries: Vec<AllowListEntry> = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let entry = AllowListEntry::parse(pattern.as_ref())?;
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        Ok(Self { entries })
    }

    /// An allow-list that admits every URL
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AllowListEntry] {
        &self.entries
    }

    /// Returns true when `url` matches any entry, or the list is empty
    pub fn allows(&self, url: &Url) -> bool {
        self.entries.is_empty() || self.entries.iter().any(|entry| entry.matches(url))
    }
}

/// Checks a URL string against raw allow-list patterns
///
/// Unparsable URLs are out of scope unless the list is empty. Unparsable
/// patterns never match.
///
/// # Examples
///
/// ```
/// use warcrawl::url::in_scope;
///
/// assert!(in_scope("https://example.com/path/root", &["example.com/path"]));
/// assert!(!in_scope("https://example.com/pathology", &["example.com/path"]));
/// assert!(in_scope("https://anything.net", &[] as &[&str]));
/// ```
pub fn in_scope<S: AsRef<str>>(url: &str, allow_list: &[S]) -> bool {
    if allow_list.is_empty() {
        return true;
    }
    let Ok(url) = Url::parse(url) else {
        return false;
    };
    allow_list.iter().any(|pattern| {
        AllowListEntry::parse(pattern.as_ref())
            .map(|entry| entry.matches(&url))
            .unwrap_or(false)
    })
}

fn normalize_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// Prefix test at a path-segment boundary: `/path` covers `/path` and
/// `/path/...` but not `/pathology`
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
