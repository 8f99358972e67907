//! In-memory fetcher serving canned pages.
//!
//! Records every requested address so callers can assert how many real
//! fetches a stage issued.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use super::client::{Fetcher, Validator, ensure_parent};
use super::error::FetchError;

/// Fetcher that answers from a fixed address → content map.
#[derive(Debug, Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for `uri`.
    pub fn with_page(mut self, uri: impl Into<String>, content: impl Into<String>) -> Self {
        self.pages.insert(uri.into(), content.into());
        self
    }

    /// Every address requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of fetches issued so far.
    pub fn request_count(&self) -> usize {
        self.requests().len()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, uri: &str, dest: &Path, validate: Validator) -> Result<(), FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(uri.to_string());
        }

        let content = self.pages.get(uri).ok_or_else(|| FetchError::Status {
            status: 404,
            uri: uri.to_string(),
        })?;

        ensure_parent(dest).await?;
        tokio::fs::write(dest, content)
            .await
            .map_err(|e| FetchError::io(dest, e))?;

        if validate(dest) {
            Ok(())
        } else {
            Err(FetchError::Invalid {
                path: dest.to_path_buf(),
                attempts: 1,
            })
        }
    }
}
