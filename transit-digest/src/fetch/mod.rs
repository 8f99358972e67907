//! Artifact transport: HTTP downloads with retries, a canned-page fetcher,
//! and zip member extraction.

mod archive;
mod client;
mod error;
mod mock;

pub use archive::extract_member;
pub use client::{Fetcher, FetcherConfig, HttpFetcher, Validator, is_non_empty_file};
pub use error::FetchError;
pub use mock::MockFetcher;
