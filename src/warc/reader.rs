//! Streaming WARC reader
//!
//! Record framing and header parsing come from the `warc` crate. Bodies are
//! streamed, so large payloads are never held in memory; whatever a caller
//! leaves unread is skipped before the next record. This module only adds
//! gzip detection and the HTTP layer inside response records.

use crate::http::{parse_response_head, HeaderList};
use crate::warc::record::RecordType;
use crate::warc::WarcError;
use flate2::read::{GzDecoder, MultiGzDecoder, ZlibDecoder};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use ::warc::WarcHeader;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Sequential reader over the records of one archive
pub struct WarcReader<R: BufRead> {
    inner: ::warc::WarcReader<R>,
}

/// Identifying header fields of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub record_type: RecordType,
    pub record_id: Option<String>,
    pub target_uri: Option<String>,
}

impl WarcReader<Box<dyn BufRead + Send>> {
    /// Opens an archive file, detecting gzip compression from its magic bytes
    pub fn open(path: &Path) -> Result<Self, WarcError> {
        let mut buffered = BufReader::new(File::open(path)?);
        let compressed = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);

        let inner: Box<dyn BufRead + Send> = if compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(buffered)))
        } else {
            Box::new(buffered)
        };
        Ok(Self::new(inner))
    }
}

impl<R: BufRead> WarcReader<R> {
    /// Wraps an already-decompressed record stream
    pub fn new(inner: R) -> Self {
        Self {
            inner: ::warc::WarcReader::new(inner),
        }
    }

    /// Walks the remaining records in file order, skipping every body
    pub fn summaries(&mut self) -> Result<Vec<RecordSummary>, WarcError> {
        let mut summaries = Vec::new();
        let mut records = self.inner.stream_records();
        while let Some(record) = records.next_item() {
            let record = record?;
            let record_type = record.header(WarcHeader::WarcType);
            summaries.push(RecordSummary {
                record_type: RecordType::parse(record_type.as_deref().unwrap_or_default()),
                record_id: record.header(WarcHeader::RecordID).map(Cow::into_owned),
                target_uri: record.header(WarcHeader::TargetURI).map(Cow::into_owned),
            });
        }
        Ok(summaries)
    }

    /// Streams the block of the first response record targeting `uri`
    ///
    /// With `uri` set to `None` the first response record is taken whatever
    /// its target. `consume` sees the raw `application/http` block; records
    /// after the match are not read. Returns `Ok(None)` when nothing matches.
    pub fn read_response<T, F>(
        &mut self,
        uri: Option<&str>,
        consume: F,
    ) -> Result<Option<T>, WarcError>
    where
        F: FnOnce(&mut dyn Read) -> Result<T, WarcError>,
    {
        let mut records = self.inner.stream_records();
        while let Some(record) = records.next_item() {
            let mut record = record?;
            if record.header(WarcHeader::WarcType).as_deref() != Some("response") {
                continue;
            }
            if let Some(uri) = uri {
                if record.header(WarcHeader::TargetURI).as_deref() != Some(uri) {
                    continue;
                }
            }
            return consume(&mut record).map(Some);
        }
        Ok(None)
    }
}

/// Lists the target URIs of every record of `record_type`, in file order
pub fn list_target_uris<R: BufRead>(
    reader: &mut WarcReader<R>,
    record_type: &RecordType,
) -> Result<Vec<String>, WarcError> {
    Ok(reader
        .summaries()?
        .into_iter()
        .filter(|summary| summary.record_type == *record_type)
        .filter_map(|summary| summary.target_uri)
        .collect())
}

/// Streams the entity body of the response archived for `uri`
///
/// The HTTP status line and headers are consumed and a `gzip` or `deflate`
/// Content-Encoding is undone before `consume` sees the content. Returns
/// `Ok(None)` when the archive holds no response for `uri`.
pub fn extract_content<R, T, F>(
    reader: &mut WarcReader<R>,
    uri: &str,
    consume: F,
) -> Result<Option<T>, WarcError>
where
    R: BufRead,
    F: FnOnce(&mut dyn Read) -> Result<T, WarcError>,
{
    reader.read_response(Some(uri), |block| {
        let mut block = BufReader::new(block);
        let headers = read_http_head(&mut block)?;
        let encoding = headers
            .get("content-encoding")
            .map(|value| value.trim().to_ascii_lowercase());

        let mut content: Box<dyn Read + '_> = match encoding.as_deref() {
            Some("gzip") | Some("x-gzip") => Box::new(GzDecoder::new(block)),
            Some("deflate") => Box::new(ZlibDecoder::new(block)),
            _ => Box::new(block),
        };
        consume(&mut content)
    })
}

fn read_http_head<B: BufRead>(body: &mut B) -> Result<HeaderList, WarcError> {
    let mut head = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if body.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line == b"\r\n" || line == b"\n" {
            break;
        }
        head.extend_from_slice(&line);
    }

    let (_, headers) = parse_response_head(&head)
        .ok_or_else(|| WarcError::Malformed("record does not hold an HTTP response".to_string()))?;
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Request, Response};
    use crate::warc::WarcWriter;
    use bytes::Bytes;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use url::Url;

    type Page<'a> = (&'a str, &'a [(&'a str, &'a str)], &'a [u8]);

    fn page<'a>(url: &'a str, headers: &'a [(&'a str, &'a str)], body: &'a [u8]) -> Page<'a> {
        (url, headers, body)
    }

    fn archive(pages: &[Page<'_>]) -> Vec<u8> {
        let mut writer = WarcWriter::uncompressed(Vec::new());
        writer.write_warcinfo().unwrap();
        for (url, headers, body) in pages {
            let url = Url::parse(url).unwrap();
            let request = Request::get(url.clone());
            let response = Response {
                status: 200,
                headers: headers.iter().copied().collect(),
                body: Bytes::copy_from_slice(body),
                final_url: url,
            };
            writer.write_exchange(&request, &response).unwrap();
        }
        writer.into_inner().unwrap()
    }

    fn reader(bytes: Vec<u8>) -> WarcReader<Cursor<Vec<u8>>> {
        WarcReader::new(Cursor::new(bytes))
    }

    fn content_of(reader: &mut WarcReader<Cursor<Vec<u8>>>, uri: &str) -> Option<Vec<u8>> {
        extract_content(reader, uri, |content| {
            let mut bytes = Vec::new();
            content.read_to_end(&mut bytes)?;
            Ok(bytes)
        })
        .unwrap()
    }

    #[test]
    fn test_summaries_in_file_order() {
        let bytes = archive(&[
            page("https://example.com/", &[("Content-Type", "text/html")], b"<p>hi</p>"),
            page("https://example.com/a.css", &[], b"body{}"),
        ]);
        let summaries = reader(bytes).summaries().unwrap();
        let types: Vec<RecordType> = summaries
            .iter()
            .map(|summary| summary.record_type.clone())
            .collect();
        assert_eq!(
            types,
            vec![
                RecordType::Warcinfo,
                RecordType::Request,
                RecordType::Response,
                RecordType::Request,
                RecordType::Response,
            ]
        );
        assert_eq!(summaries[0].target_uri, None);
        assert_eq!(summaries[3].target_uri.as_deref(), Some("https://example.com/a.css"));
        assert!(summaries.iter().all(|summary| summary.record_id.is_some()));
    }

    #[test]
    fn test_list_target_uris() {
        let bytes = archive(&[
            page("https://example.com/", &[], b"one"),
            page("https://example.com/two", &[], b"two"),
        ]);
        let uris = list_target_uris(&mut reader(bytes.clone()), &RecordType::Response).unwrap();
        assert_eq!(uris, vec!["https://example.com/", "https://example.com/two"]);

        let requests = list_target_uris(&mut reader(bytes), &RecordType::Request).unwrap();
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn test_partial_body_read() {
        let bytes = archive(&[
            page("https://example.com/", &[], b"a long enough body"),
            page("https://example.com/b", &[], b"second"),
        ]);
        let first = reader(bytes.clone())
            .read_response(Some("https://example.com/"), |block| {
                let mut first = [0u8; 4];
                block.read_exact(&mut first)?;
                Ok(first)
            })
            .unwrap();
        assert_eq!(first, Some(*b"HTTP"));

        let second = content_of(&mut reader(bytes), "https://example.com/b");
        assert_eq!(second.unwrap(), b"second");
    }

    #[test]
    fn test_read_response_without_uri_takes_first() {
        let bytes = archive(&[
            page("https://example.com/one", &[], b"one"),
            page("https://example.com/two", &[], b"two"),
        ]);
        let block = reader(bytes)
            .read_response(None, |block| {
                let mut text = String::new();
                block.read_to_string(&mut text)?;
                Ok(text)
            })
            .unwrap()
            .unwrap();
        assert!(block.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(block.ends_with("\r\n\r\none"));
    }

    #[test]
    fn test_extract_content_plain() {
        let bytes = archive(&[page(
            "https://example.com/",
            &[("Content-Type", "text/plain")],
            b"payload",
        )]);
        let content = content_of(&mut reader(bytes), "https://example.com/");
        assert_eq!(content.unwrap(), b"payload");
    }

    #[test]
    fn test_extract_content_decodes_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"compressed payload").unwrap();
        let gzipped = encoder.finish().unwrap();

        let bytes = archive(&[page(
            "https://example.com/z",
            &[("Content-Encoding", "gzip")],
            &gzipped,
        )]);
        let content = content_of(&mut reader(bytes), "https://example.com/z");
        assert_eq!(content.unwrap(), b"compressed payload");
    }

    #[test]
    fn test_find_response_missing() {
        let bytes = archive(&[page("https://example.com/", &[], b"x")]);
        assert!(content_of(&mut reader(bytes), "https://other.com/").is_none());
    }

    #[test]
    fn test_gzip_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.warc.gz");
        {
            let mut writer = WarcWriter::create(&path).unwrap();
            let url = Url::parse("https://example.com/img.png").unwrap();
            let response = Response {
                status: 200,
                headers: [("Content-Type", "image/png")].into_iter().collect(),
                body: Bytes::from_static(b"\x89PNG"),
                final_url: url.clone(),
            };
            writer.write_exchange(&Request::get(url), &response).unwrap();
            writer.flush().unwrap();
        }

        let summaries = WarcReader::open(&path).unwrap().summaries().unwrap();
        assert_eq!(summaries[0].record_type, RecordType::Warcinfo);

        let mut reader = WarcReader::open(&path).unwrap();
        let content = extract_content(&mut reader, "https://example.com/img.png", |content| {
            let mut bytes = Vec::new();
            content.read_to_end(&mut bytes)?;
            Ok(bytes)
        })
        .unwrap();
        assert_eq!(content.unwrap(), b"\x89PNG");
    }

    #[test]
    fn test_empty_stream() {
        assert!(reader(Vec::new()).summaries().unwrap().is_empty());
    }
}
