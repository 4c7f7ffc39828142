//! Configuration module for warcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, plus `key=value` overrides and seed lists.
//!
//! # Example
//!
//! ```no_run
//! use warcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("warcrawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetchConfig, OutputConfig, ScopeConfig, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_DEPTH,
};

// Re-export parser functions
pub use parser::{
    apply_setting, apply_setting_arg, compute_config_hash, load_config, load_config_with_hash,
    load_seed_urls,
};
pub use validation::validate;
