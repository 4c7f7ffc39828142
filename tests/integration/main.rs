//! Integration tests for warcrawl

mod crawl_tests;
mod warc_tests;
