//! WARC 1.0 archive format
//!
//! [`WarcWriter`] appends request/response exchanges to a gzip-per-record
//! file and [`WarcReader`] walks one back, record by record. Both sit on
//! the `warc` crate for record framing.

mod reader;
mod record;
mod writer;

pub use reader::{extract_content, list_target_uris, RecordSummary, WarcReader};
pub use record::{new_record_id, sha256_digest, RecordType};
pub use writer::{ArchiveSink, WarcWriter};

use thiserror::Error;

/// Errors raised while reading or writing an archive
#[derive(Debug, Error)]
pub enum WarcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed WARC record: {0}")]
    Malformed(String),
}

impl From<::warc::Error> for WarcError {
    fn from(e: ::warc::Error) -> Self {
        WarcError::Malformed(e.to_string())
    }
}
