//! HTTP fetcher implementation
//!
//! The engine only needs "send this request, give me the response or a
//! failure". [`Fetcher`] is that seam; [`HttpFetcher`] implements it with
//! reqwest. Redirects are never followed here, and bodies are recorded
//! exactly as they came off the wire.

use crate::config::FetchConfig;
use crate::http::{HeaderList, Request, Response};
use crate::state::TaskState;
use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::header::TRANSFER_ENCODING;
use reqwest::{redirect::Policy, Client, Method};
use std::time::Duration;
use thiserror::Error;

/// Why a fetch produced no response
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("fetch cancelled before dispatch")]
    Cancelled,
}

impl FetchError {
    /// Terminal task state this failure maps to
    pub fn task_state(&self) -> TaskState {
        match self {
            Self::Timeout => TaskState::TimedOut,
            _ => TaskState::Failed,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Capability to perform one HTTP exchange
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Sends `request` and returns the complete response
    ///
    /// Implementations must not follow redirects, and must enforce their own
    /// timeout and body-size limits.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Builds the reqwest client used by [`HttpFetcher`]
///
/// Automatic decompression is off so archived bodies match the wire bytes,
/// and the redirect policy is `none` because the engine follows redirects
/// itself.
///
/// # Arguments
///
/// * `config` - Fetch settings (timeout is taken from here)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .redirect(Policy::none())
        .no_gzip()
        .no_brotli()
        .build()
}

/// [`Fetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_size: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            max_body_size: config.max_body_size,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::InvalidMethod(request.method.clone()))?;

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        let mut response = builder.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();

        if let Some(length) = response.content_length() {
            if length > self.max_body_size {
                return Err(FetchError::BodyTooLarge {
                    limit: self.max_body_size,
                });
            }
        }

        // The body is handed over de-chunked, so the framing header would lie
        let headers: HeaderList = response
            .headers()
            .iter()
            .filter(|(name, _)| *name != TRANSFER_ENCODING)
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > self.max_body_size {
                return Err(FetchError::BodyTooLarge {
                    limit: self.max_body_size,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Response {
            status,
            headers,
            body: body.freeze(),
            final_url,
        })
    }
}
