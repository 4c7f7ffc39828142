//! Integration tests for reading back written archives

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use url::Url;
use warcrawl::http::{HeaderList, Request, Response};
use warcrawl::warc::{extract_content, list_target_uris, RecordType, WarcReader, WarcWriter};

fn exchange(url: &str, content_type: &str, body: Vec<u8>) -> (Request, Response) {
    let url = Url::parse(url).expect("valid test URL");
    let request = Request::get(url.clone()).with_header("User-Agent", "TestBot/1.0");
    let mut headers = HeaderList::new();
    headers.push("Content-Type", content_type);
    let response = Response {
        status: 200,
        headers,
        body: Bytes::from(body),
        final_url: url,
    };
    (request, response)
}

fn extracted(path: &std::path::Path, uri: &str) -> Option<Vec<u8>> {
    let mut reader = WarcReader::open(path).expect("Failed to open archive");
    extract_content(&mut reader, uri, |content| {
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
    .expect("Failed to decode record")
}

#[test]
fn test_round_trip_preserves_body_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("round-trip.warc.gz");

    let binary: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let html = b"<html>\r\n\r\nWARC/1.0\r\n</html>".to_vec();
    let mut writer = WarcWriter::create(&path).unwrap();
    for (request, response) in [
        exchange("https://example.com/blob.bin", "application/octet-stream", binary.clone()),
        exchange("https://example.com/", "text/html", html.clone()),
        exchange("https://example.com/empty", "text/plain", Vec::new()),
    ] {
        writer.write_exchange(&request, &response).unwrap();
    }
    assert_eq!(writer.exchanges_written(), 3);
    writer.into_inner().unwrap();

    assert_eq!(extracted(&path, "https://example.com/blob.bin"), Some(binary));
    assert_eq!(extracted(&path, "https://example.com/"), Some(html));
    assert_eq!(extracted(&path, "https://example.com/empty"), Some(Vec::new()));
    assert_eq!(extracted(&path, "https://example.com/absent"), None);
}

#[test]
fn test_listing_follows_write_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("order.warc.gz");

    let written: Vec<String> = (0..5)
        .map(|i| format!("https://example.com/page/{}", 4 - i))
        .collect();
    let mut writer = WarcWriter::create(&path).unwrap();
    for uri in &written {
        let (request, response) = exchange(uri, "text/html", uri.as_bytes().to_vec());
        writer.write_exchange(&request, &response).unwrap();
    }
    writer.into_inner().unwrap();

    let list = |record_type| -> Vec<String> {
        list_target_uris(&mut WarcReader::open(&path).unwrap(), &record_type).unwrap()
    };
    assert_eq!(list(RecordType::Response), written);
    assert_eq!(list(RecordType::Request), written);

    let types: Vec<RecordType> = WarcReader::open(&path)
        .unwrap()
        .summaries()
        .unwrap()
        .into_iter()
        .map(|summary| summary.record_type)
        .collect();
    assert_eq!(types.len(), 11);
    assert_eq!(types[0], RecordType::Warcinfo);
    assert_eq!(types[1], RecordType::Request);
    assert_eq!(types[2], RecordType::Response);
}

#[test]
fn test_extract_decodes_gzip_content_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("encoded.warc.gz");

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"body { color: red }").unwrap();
    let compressed = encoder.finish().unwrap();

    let (request, mut response) = exchange("https://example.com/s.css", "text/css", compressed);
    response.headers.push("Content-Encoding", "gzip");

    let mut writer = WarcWriter::create(&path).unwrap();
    writer.write_exchange(&request, &response).unwrap();
    writer.into_inner().unwrap();

    assert_eq!(
        extracted(&path, "https://example.com/s.css"),
        Some(b"body { color: red }".to_vec())
    );
}

#[test]
fn test_extract_streams_in_small_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chunks.warc.gz");
    let body: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

    let (request, response) =
        exchange("https://example.com/big", "application/octet-stream", body.clone());
    let mut writer = WarcWriter::create(&path).unwrap();
    writer.write_exchange(&request, &response).unwrap();
    writer.into_inner().unwrap();

    let mut reader = WarcReader::open(&path).unwrap();
    let collected = extract_content(&mut reader, "https://example.com/big", |content| {
        let mut collected = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = content.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            assert!(read <= chunk.len());
            collected.extend_from_slice(&chunk[..read]);
        }
        Ok(collected)
    })
    .unwrap();
    assert_eq!(collected, Some(body));
}
