//! Streaming WARC writer
//!
//! Each exchange becomes a request record immediately followed by its
//! response record. Records are built with the `warc` crate and each one is
//! gzip-compressed as its own member. The pair is written and flushed in one
//! go, so the file stays readable up to the last complete exchange.

use crate::http::{request_block, response_block, Request, Response};
use crate::warc::record::{new_record_id, sha256_digest};
use crate::warc::WarcError;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use ::warc::{BufferedBody, Record, RecordBuilder, RecordType, WarcHeader};

/// Destination for archived exchanges
///
/// Methods take `&mut self`, so an owner hands out one exchange at a time
/// and records of different exchanges never interleave.
pub trait ArchiveSink: Send {
    /// Persists one request/response exchange
    fn write_exchange(
        &mut self,
        request: &Request,
        response: &Response,
    ) -> Result<(), WarcError>;

    /// Flushes and closes the underlying stream
    fn close(&mut self) -> Result<(), WarcError>;
}

/// Writes WARC 1.0 records to any byte sink
pub struct WarcWriter<W: Write> {
    out: W,
    compress: bool,
    exchanges: u64,
    bytes_written: u64,
}

impl WarcWriter<BufWriter<File>> {
    /// Creates (or truncates) an archive file and writes its `warcinfo` record
    pub fn create(path: &Path) -> Result<Self, WarcError> {
        let file = File::create(path)?;
        let mut writer = Self::new(BufWriter::new(file));
        writer.write_warcinfo()?;
        Ok(writer)
    }
}

impl<W: Write> WarcWriter<W> {
    /// Wraps a sink, compressing each record as its own gzip member
    pub fn new(out: W) -> Self {
        Self {
            out,
            compress: true,
            exchanges: 0,
            bytes_written: 0,
        }
    }

    /// Wraps a sink without compression
    pub fn uncompressed(out: W) -> Self {
        Self {
            compress: false,
            ..Self::new(out)
        }
    }

    /// Writes the `warcinfo` record describing this archive
    pub fn write_warcinfo(&mut self) -> Result<(), WarcError> {
        let block = format!(
            "software: warcrawl/{}\r\nformat: WARC File Format 1.0\r\nconformsTo: http://bibnum.bnf.fr/WARC/WARC_ISO_28500_version1_latestdraft.pdf\r\n",
            env!("CARGO_PKG_VERSION")
        )
        .into_bytes();

        let record = RecordBuilder::default()
            .warc_type(RecordType::WarcInfo)
            .warc_id(new_record_id())
            .date(Utc::now())
            .header(WarcHeader::ContentType, "application/warc-fields")
            .body(block)
            .build()?;

        let encoded = self.encode(&record)?;
        self.write_all(&encoded)
    }

    /// Appends a request record and its response record
    ///
    /// Both records target the request URL. The response record carries the
    /// full body as payload.
    pub fn write_exchange(
        &mut self,
        request: &Request,
        response: &Response,
    ) -> Result<(), WarcError> {
        let date = Utc::now();
        let target = request.url.as_str();
        let response_id = new_record_id();

        let request_bytes = request_block(request);
        let request_digest = sha256_digest(&request_bytes);
        let request_record = RecordBuilder::default()
            .warc_type(RecordType::Request)
            .warc_id(new_record_id())
            .date(date)
            .header(WarcHeader::TargetURI, target)
            .header(WarcHeader::ConcurrentTo, response_id.as_str())
            .header(WarcHeader::ContentType, "application/http; msgtype=request")
            .header(WarcHeader::BlockDigest, request_digest)
            .body(request_bytes)
            .build()?;

        let response_bytes = response_block(response);
        let response_digest = sha256_digest(&response_bytes);
        let response_record = RecordBuilder::default()
            .warc_type(RecordType::Response)
            .warc_id(response_id)
            .date(date)
            .header(WarcHeader::TargetURI, target)
            .header(WarcHeader::ContentType, "application/http; msgtype=response")
            .header(WarcHeader::BlockDigest, response_digest)
            .header(WarcHeader::PayloadDigest, sha256_digest(&response.body))
            .body(response_bytes)
            .build()?;

        let mut encoded = self.encode(&request_record)?;
        encoded.extend(self.encode(&response_record)?);
        self.write_all(&encoded)?;
        self.exchanges += 1;

        tracing::trace!(
            "Archived {} ({} bytes, status {})",
            target,
            response.body.len(),
            response.status
        );
        Ok(())
    }

    /// Number of exchanges written so far
    pub fn exchanges_written(&self) -> u64 {
        self.exchanges
    }

    /// Bytes written to the underlying sink so far (after compression)
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn flush(&mut self) -> Result<(), WarcError> {
        self.out.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying sink
    pub fn into_inner(mut self) -> Result<W, WarcError> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), WarcError> {
        self.out.write_all(bytes)?;
        self.out.flush()?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Serializes one record, as a gzip member of its own when compressing
    fn encode(&self, record: &Record<BufferedBody>) -> Result<Vec<u8>, WarcError> {
        if !self.compress {
            let mut plain = Vec::new();
            ::warc::WarcWriter::new(&mut plain).write(record)?;
            return Ok(plain);
        }

        let mut member = GzEncoder::new(Vec::new(), Compression::default());
        ::warc::WarcWriter::new(&mut member).write(record)?;
        Ok(member.finish()?)
    }
}

impl<W: Write + Send> ArchiveSink for WarcWriter<W> {
    fn write_exchange(
        &mut self,
        request: &Request,
        response: &Response,
    ) -> Result<(), WarcError> {
        WarcWriter::write_exchange(self, request, response)
    }

    fn close(&mut self) -> Result<(), WarcError> {
        self.flush()
    }
}
