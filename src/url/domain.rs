use url::Url;

/// Builds the key used to group requests per origin host
///
/// The key is the lowercase host plus the explicit port, if any. Requests
/// sharing a key share the per-host concurrency ceiling.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use warcrawl::url::host_key;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(host_key(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
