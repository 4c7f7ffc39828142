use serde::Deserialize;

/// Default maximum crawl depth (seeds are depth 0)
pub const DEFAULT_MAX_DEPTH: u32 = 1;

/// Default chunk size for streaming extracted content (512 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Main configuration structure for warcrawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum page-to-page hops from a seed URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of fetches in flight across all hosts
    #[serde(
        rename = "max-concurrent-requests",
        default = "default_max_concurrent_requests"
    )]
    pub max_concurrent_requests: u32,

    /// Maximum number of fetches in flight against one host
    #[serde(
        rename = "max-requests-per-host",
        default = "default_max_requests_per_host"
    )]
    pub max_requests_per_host: u32,

    /// Maximum number of redirect hops followed from one request
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Request header names included in request fingerprints
    #[serde(rename = "fingerprint-headers", default)]
    pub fingerprint_headers: Vec<String>,
}

/// Fetch behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// User-Agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size (bytes)
    #[serde(rename = "max-body-size", default = "default_max_body_size")]
    pub max_body_size: u64,

    /// Accept-Language sent with every request
    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,

    /// Directory for the response cache; caching is off when unset
    #[serde(rename = "cache-dir", default)]
    pub cache_dir: Option<String>,
}

/// Crawl scope configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeConfig {
    /// Allow-list patterns; empty means every URL is in scope
    #[serde(rename = "allowed-uris", default)]
    pub allowed_uris: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Chunk size used when streaming extracted content
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_concurrent_requests: default_max_concurrent_requests(),
            max_requests_per_host: default_max_requests_per_host(),
            max_redirects: default_max_redirects(),
            fingerprint_headers: Vec::new(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_body_size: default_max_body_size(),
            accept_language: default_accept_language(),
            cache_dir: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_max_concurrent_requests() -> u32 {
    256
}

fn default_max_requests_per_host() -> u32 {
    8
}

fn default_max_redirects() -> u32 {
    10
}

fn default_user_agent() -> String {
    format!("warcrawl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_ms() -> u64 {
    180_000
}

fn default_max_body_size() -> u64 {
    1024 * 1024 * 1024
}

fn default_accept_language() -> String {
    "en".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
