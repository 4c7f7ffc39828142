//! Request fingerprints and the run-scoped history of scheduled requests

use crate::http::Request;
use crate::url::canonicalize_url;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// SHA-256 digest identifying a request for deduplication
///
/// Covers the uppercased method, the canonical URL (fragment removed,
/// query pairs sorted) and the values of the configured header names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestFingerprint([u8; 32]);

impl RequestFingerprint {
    /// Computes the fingerprint of `request`
    ///
    /// Header names in `headers` are matched case-insensitively and hashed in
    /// sorted order, so the order they are configured in does not matter.
    pub fn of(request: &Request, headers: &[String]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(request.method.to_ascii_uppercase().as_bytes());
        hasher.update(b"\n");
        hasher.update(canonicalize_url(&request.url).as_bytes());

        let mut names: Vec<String> = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
        names.sort();
        names.dedup();
        for name in names {
            hasher.update(b"\n");
            hasher.update(name.as_bytes());
            hasher.update(b":");
            if let Some(value) = request.headers.get(&name) {
                hasher.update(value.trim().as_bytes());
            }
        }

        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Set of fingerprints already scheduled in one crawl run
///
/// Entries are never removed; the set lives exactly as long as the run.
#[derive(Debug, Default)]
pub struct RequestHistory {
    seen: Mutex<HashSet<RequestFingerprint>>,
    fingerprint_headers: Vec<String>,
}

impl RequestHistory {
    pub fn new(fingerprint_headers: Vec<String>) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            fingerprint_headers,
        }
    }

    pub fn fingerprint(&self, request: &Request) -> RequestFingerprint {
        RequestFingerprint::of(request, &self.fingerprint_headers)
    }

    /// Records `request` and returns true, or returns false if an equivalent
    /// request was admitted before
    ///
    /// The check and the insert happen under one lock, so concurrent callers
    /// admit each fingerprint at most once.
    pub fn admit(&self, request: &Request) -> bool {
        let fingerprint = self.fingerprint(request);
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fingerprint)
    }

    pub fn contains(&self, request: &Request) -> bool {
        let fingerprint = self.fingerprint(request);
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
