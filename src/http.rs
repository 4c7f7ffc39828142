//! HTTP request/response values shared by the fetcher and the archive
//!
//! The crawl engine builds [`Request`]s, the fetch capability turns them into
//! [`Response`]s, and the WARC layer renders both back into HTTP/1.1 message
//! blocks. Headers are kept as an ordered list so repeated names survive.

use bytes::Bytes;
use reqwest::StatusCode;
use url::Url;

/// Ordered list of header name/value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<(String, String)>);

impl HeaderList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a header, keeping any existing entries with the same name
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`, compared case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// An outgoing HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: HeaderList,
}

impl Request {
    /// Creates a GET request with no headers
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            headers: HeaderList::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(name, value);
        self
    }
}

/// A completed HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderList,
    pub body: Bytes,
    pub final_url: Url,
}

impl Response {
    /// Returns the primary media type of `Content-Type`, lowercased
    ///
    /// `text/html; charset=utf-8` yields `text/html`. Returns `None` when the
    /// header is absent.
    pub fn media_type(&self) -> Option<String> {
        self.headers.get("content-type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Returns the `Location` header when this is a 3xx response
    pub fn redirect_location(&self) -> Option<&str> {
        if (300..400).contains(&self.status) {
            self.headers.get("location").map(str::trim).filter(|l| !l.is_empty())
        } else {
            None
        }
    }
}

/// Looks up the reason phrase for a status code
///
/// Unknown codes map to `"Unknown"`, so the reconstructed status line may
/// differ from what the origin actually sent.
pub fn reason_phrase(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown")
}

/// Renders the request head as stored in a WARC request record
///
/// The request line uses the path and query only. A `Host` header is
/// inserted first when the request does not carry one.
pub fn request_block(request: &Request) -> Vec<u8> {
    let mut target = request.url.path().to_string();
    if let Some(query) = request.url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut block = format!("{} {} HTTP/1.1\r\n", request.method, target);
    if !request.headers.contains("host") {
        if let Some(host) = host_header(&request.url) {
            block.push_str(&format!("Host: {}\r\n", host));
        }
    }
    for (name, value) in request.headers.iter() {
        block.push_str(&format!("{}: {}\r\n", name, value));
    }
    block.push_str("\r\n");
    block.into_bytes()
}

/// Renders the full response (head and body) as stored in a WARC response record
pub fn response_block(response: &Response) -> Vec<u8> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        reason_phrase(response.status)
    );
    for (name, value) in response.headers.iter() {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    let mut block = head.into_bytes();
    block.extend_from_slice(&response.body);
    block
}

fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Parses a status line and header lines from a response head
///
/// `head` must not include the terminating blank line. Returns `None` when
/// the status line is not `HTTP/x.y CODE ...`.
pub fn parse_response_head(head: &[u8]) -> Option<(u16, HeaderList)> {
    let text = String::from_utf8_lossy(head);
    let mut lines = text.split("\r\n").flat_map(|line| line.split('\n'));

    let status_line = lines.next()?;
    let mut parts = status_line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    let status = parts.next()?.parse::<u16>().ok()?;

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    Some((status, headers))
}

/// Splits a response block into its head and body at the first blank line
pub fn split_head(block: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    let position = block
        .windows(separator.len())
        .position(|window| window == separator)?;
    Some((&block[..position], &block[position + separator.len()..]))
}
