use crate::config::types::{Config, CrawlerConfig, FetchConfig, OutputConfig, ScopeConfig};
use crate::url::AllowListEntry;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_scope_config(&config.scope)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be >= 1, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.max_requests_per_host < 1 {
        return Err(ConfigError::Validation(format!(
            "max-requests-per-host must be >= 1, got {}",
            config.max_requests_per_host
        )));
    }

    if config.max_requests_per_host > config.max_concurrent_requests {
        return Err(ConfigError::Validation(format!(
            "max-requests-per-host ({}) cannot exceed max-concurrent-requests ({})",
            config.max_requests_per_host, config.max_concurrent_requests
        )));
    }

    for name in &config.fingerprint_headers {
        if name.is_empty() || name.contains(|c: char| c == ':' || c.is_whitespace()) {
            return Err(ConfigError::Validation(format!(
                "invalid header name in fingerprint-headers: '{}'",
                name
            )));
        }
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.max_body_size < 1 {
        return Err(ConfigError::Validation(
            "max-body-size must be >= 1".to_string(),
        ));
    }

    if let Some(dir) = &config.cache_dir {
        if dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cache-dir cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates every allow-list pattern
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    for pattern in &config.allowed_uris {
        AllowListEntry::parse(pattern)?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.chunk_size < 1 {
        return Err(ConfigError::Validation(
            "chunk-size must be >= 1".to_string(),
        ));
    }
    Ok(())
}
