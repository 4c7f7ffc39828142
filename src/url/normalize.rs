use crate::UrlError;
use url::Url;

/// Parses an absolute http(s) URL, dropping any fragment
///
/// This is the entry point for seed URLs, which must be fetchable as given.
///
/// # Examples
///
/// ```
/// use warcrawl::url::parse_http_url;
///
/// let url = parse_http_url("https://Example.com/page#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// assert!(parse_http_url("ftp://example.com/").is_err());
/// ```
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|source| UrlError::Parse {
        url: url_str.to_string(),
        source,
    })?;

    if !is_http(&url) {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(url_str.to_string()));
    }

    Ok(strip_fragment(url))
}

/// Returns true for `http` and `https` URLs
pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Removes the `#...` fragment from a URL
///
/// Fragments never reach the server, so they are stripped before a URL is
/// fetched or fingerprinted.
pub fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Resolves a reference found in a document against the document's URL
///
/// Surrounding whitespace is ignored and the fragment is stripped. Returns
/// `None` for empty or unparsable references.
pub fn resolve_reference(base: &Url, reference: &str) -> Option<Url> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    base.join(reference).ok().map(strip_fragment)
}

/// Produces the canonical form of a URL used for request fingerprinting
///
/// # Canonicalization Steps
///
/// 1. Scheme and host are lowercased and default ports dropped (by parsing)
/// 2. The fragment is removed
/// 3. Query pairs are sorted by key, then value; blank values are kept
/// 4. An empty query (`?` alone) is removed
///
/// # Examples
///
/// ```
/// use url::Url;
/// use warcrawl::url::canonicalize_url;
///
/// let a = Url::parse("https://example.com/p?b=2&a=1#frag").unwrap();
/// let b = Url::parse("HTTPS://EXAMPLE.COM:443/p?a=1&b=2").unwrap();
/// assert_eq!(canonicalize_url(&a), canonicalize_url(&b));
/// ```
pub fn canonicalize_url(url: &Url) -> String {
    let mut canonical = url.clone();
    canonical.set_fragment(None);

    match url.query() {
        Some(query) if !query.is_empty() => {
            let mut pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            pairs.sort();
            canonical
                .query_pairs_mut()
                .clear()
                .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        _ => canonical.set_query(None),
    }

    canonical.to_string()
}
