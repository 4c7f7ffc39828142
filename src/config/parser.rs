use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use warcrawl::config::load_config;
///
/// let config = load_config(Path::new("warcrawl.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so an archive can be traced back to the settings that
/// produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Applies a single `key=value` override, as given to `--settings`
///
/// Keys are `section.name` using the same names as the TOML file, for
/// example `crawler.max-depth=3` or `fetch.timeout-ms=5000`. List settings
/// take comma-separated values. The result is not validated; call
/// [`validate`](crate::config::validate) once all overrides are applied.
pub fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    match key.trim() {
        "crawler.max-depth" => config.crawler.max_depth = parse_value(key, value)?,
        "crawler.max-concurrent-requests" => {
            config.crawler.max_concurrent_requests = parse_value(key, value)?
        }
        "crawler.max-requests-per-host" => {
            config.crawler.max_requests_per_host = parse_value(key, value)?
        }
        "crawler.max-redirects" => config.crawler.max_redirects = parse_value(key, value)?,
        "crawler.fingerprint-headers" => config.crawler.fingerprint_headers = parse_list(value),
        "fetch.user-agent" => config.fetch.user_agent = value.to_string(),
        "fetch.timeout-ms" => config.fetch.timeout_ms = parse_value(key, value)?,
        "fetch.max-body-size" => config.fetch.max_body_size = parse_value(key, value)?,
        "fetch.accept-language" => config.fetch.accept_language = value.to_string(),
        "fetch.cache-dir" => {
            config.fetch.cache_dir = (!value.is_empty()).then(|| value.to_string())
        }
        "scope.allowed-uris" => config.scope.allowed_uris = parse_list(value),
        "output.chunk-size" => config.output.chunk_size = parse_value(key, value)?,
        other => return Err(ConfigError::UnknownSetting(other.to_string())),
    }
    Ok(())
}

/// Splits a `key=value` argument and applies it
pub fn apply_setting_arg(config: &mut Config, arg: &str) -> Result<(), ConfigError> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidSetting {
            key: arg.to_string(),
            value: String::new(),
        })?;
    apply_setting(config, key, value)
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads seed URLs from a file, one per line
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
pub fn load_seed_urls(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
