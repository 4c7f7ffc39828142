//! On-disk response cache
//!
//! Each cached exchange is stored as its own single-exchange gzip WARC,
//! named after the request fingerprint. Cache problems never fail a fetch:
//! they are logged and the request goes to the network.

use crate::crawler::dedup::RequestFingerprint;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::http::{parse_response_head, split_head, Request, Response};
use crate::warc::{WarcError, WarcReader, WarcWriter};
use async_trait::async_trait;
use bytes::Bytes;
use std::fs::{self, File};
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};

/// Default cache directory used when caching is enabled without a path
pub const DEFAULT_CACHE_DIR: &str = ".warcrawl-cache";

/// A [`Fetcher`] that replays previously stored responses
pub struct CachedFetcher<F: Fetcher> {
    inner: F,
    dir: PathBuf,
    fingerprint_headers: Vec<String>,
}

impl<F: Fetcher> CachedFetcher<F> {
    /// Wraps `inner`, creating the cache directory if needed
    pub fn new(
        inner: F,
        dir: impl Into<PathBuf>,
        fingerprint_headers: Vec<String>,
    ) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            inner,
            dir,
            fingerprint_headers,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, request: &Request) -> PathBuf {
        let fingerprint = RequestFingerprint::of(request, &self.fingerprint_headers);
        self.dir.join(format!("{}.warc.gz", fingerprint.to_hex()))
    }
}

/// Reads the response stored at `path`, if any
///
/// An entry holds exactly one exchange and its name already identifies the
/// request, so the first response record is taken whatever its target URI.
fn load(path: &Path, request: &Request) -> Result<Option<Response>, WarcError> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = WarcReader::open(path)?;
    let Some(block) = reader.read_response(None, |block| {
        let mut bytes = Vec::new();
        block.read_to_end(&mut bytes)?;
        Ok(bytes)
    })?
    else {
        return Ok(None);
    };

    let (head, body) = split_head(&block)
        .ok_or_else(|| WarcError::Malformed("cached response has no header end".to_string()))?;
    let (status, headers) = parse_response_head(head)
        .ok_or_else(|| WarcError::Malformed("cached response has no status line".to_string()))?;

    Ok(Some(Response {
        status,
        headers,
        body: Bytes::copy_from_slice(body),
        final_url: request.url.clone(),
    }))
}

/// Writes a single-exchange entry, renaming it into place once complete
fn store(path: &Path, request: &Request, response: &Response) -> Result<(), WarcError> {
    let partial = path.with_extension("partial");
    let mut writer = WarcWriter::new(BufWriter::new(File::create(&partial)?));
    writer.write_exchange(request, response)?;
    writer.into_inner()?;
    fs::rename(&partial, path)?;
    Ok(())
}

#[async_trait]
impl<F: Fetcher> Fetcher for CachedFetcher<F> {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let path = self.entry_path(request);

        let lookup = {
            let path = path.clone();
            let request = request.clone();
            tokio::task::spawn_blocking(move || load(&path, &request)).await
        };
        match lookup {
            Ok(Ok(Some(response))) => {
                tracing::debug!("Cache hit for {}", request.url);
                return Ok(response);
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::warn!("Ignoring unreadable cache entry {}: {}", path.display(), e)
            }
            Err(e) => tracing::warn!("Cache lookup for {} did not finish: {}", request.url, e),
        }

        let response = self.inner.fetch(request).await?;

        let stored = {
            let request = request.clone();
            let response = response.clone();
            tokio::task::spawn_blocking(move || store(&path, &request, &response)).await
        };
        match stored {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to cache {}: {}", request.url, e),
            Err(e) => tracing::warn!("Cache write for {} did not finish: {}", request.url, e),
        }
        Ok(response)
    }
}
