//! Canned HTTP responses keyed by URL

use cladetime_core::{CladetimeError, CladetimeResult};
use cladetime_remote::{Fetcher, HttpResponse};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Unknown URLs answer 404
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, HttpResponse>>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.respond(url, 200, body.into());
        self
    }

    pub fn with_json(self, url: &str, value: &serde_json::Value) -> Self {
        self.respond(url, 200, value.to_string().into_bytes());
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.respond(url, status, Vec::new());
        self
    }

    pub fn respond(&self, url: &str, status: u16, body: Vec<u8>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(url.to_string(), HttpResponse { status, body });
        }
    }

    /// Every URL requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| u.as_str() == url).count()
    }

    fn lookup(&self, url: &str) -> HttpResponse {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(url).cloned())
            .unwrap_or(HttpResponse {
                status: 404,
                body: b"Not Found".to_vec(),
            })
    }
}

impl Fetcher for MockFetcher {
    fn get(&self, url: &str) -> CladetimeResult<HttpResponse> {
        Ok(self.lookup(url))
    }

    fn download(&self, url: &str, dest: &Path) -> CladetimeResult<u64> {
        let response = self.lookup(url);
        if !response.is_success() {
            return Err(CladetimeError::Network(format!(
                "Download of {} returned status: {}",
                url, response.status
            )));
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, &response.body)?;
        Ok(response.body.len() as u64)
    }
}
