//! warcrawl: archive web pages and their requisites as WARC
//!
//! This crate crawls a set of seed URLs, follows embedded resources (images,
//! stylesheets, scripts, media) and linked pages up to a depth limit, and
//! writes every request/response exchange into a gzip-per-record WARC file.

pub mod config;
pub mod crawler;
pub mod http;
pub mod output;
pub mod state;
pub mod url;
pub mod warc;

use thiserror::Error;

/// Main error type for warcrawl operations
#[derive(Debug, Error)]
pub enum WarcrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Archive error: {0}")]
    Warc(#[from] warc::WarcError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TaskState,
        to: state::TaskState,
    },

    #[error("No seed URLs were given")]
    NoSeeds,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidSetting { key: String, value: String },

    #[error("Invalid allow-list pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL {url}: {source}")]
    Parse {
        url: String,
        source: ::url::ParseError,
    },

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for warcrawl operations
pub type Result<T> = std::result::Result<T, WarcrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, HttpFetcher};
pub use state::TaskState;
pub use url::{canonicalize_url, in_scope, strip_fragment, AllowList};
pub use warc::{WarcReader, WarcWriter};
