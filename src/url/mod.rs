//! URL handling module for warcrawl
//!
//! This module provides seed parsing, reference resolution, fragment
//! stripping, canonicalization for fingerprints, per-host keys, and
//! allow-list scope matching.

mod domain;
mod normalize;
mod scope;

pub use domain::host_key;
pub use normalize::{
    canonicalize_url, is_http, parse_http_url, resolve_reference, strip_fragment,
};
pub use scope::{in_scope, AllowList, AllowListEntry};
