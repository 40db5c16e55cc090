//! Blocking HTTP access
//!
//! Non-success statuses are returned to the caller, not raised: a 404 from
//! the archive means "not published that day" and a failed metadata fetch
//! means "no metadata", both of which are expected.

use cladetime_core::config::HttpConfig;
use cladetime_core::{CladetimeError, CladetimeResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::resilience::{with_retry, RetryPolicy};

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> CladetimeResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub trait Fetcher: Send + Sync {
    /// GET a URL into memory; transport failures are `Network` errors
    fn get(&self, url: &str) -> CladetimeResult<HttpResponse>;

    /// Stream a URL to `dest`, returning the number of bytes written.
    /// Non-success statuses are `Network` errors here.
    fn download(&self, url: &str, dest: &Path) -> CladetimeResult<u64>;
}

/// reqwest-backed fetcher with a request timeout and retry on transport errors
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
}

impl ReqwestFetcher {
    pub fn new(config: &HttpConfig) -> CladetimeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("cladetime/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CladetimeError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retry: RetryPolicy::for_network(config.retry_attempts),
        })
    }

    fn send(&self, url: &str) -> CladetimeResult<reqwest::blocking::Response> {
        with_retry(
            || {
                self.client
                    .get(url)
                    .send()
                    .map_err(|e| CladetimeError::Network(format!("GET {} failed: {}", url, e)))
            },
            &self.retry,
            url,
        )
    }
}

impl Fetcher for ReqwestFetcher {
    fn get(&self, url: &str) -> CladetimeResult<HttpResponse> {
        debug!(url, "GET");
        let response = self.send(url)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| CladetimeError::Network(format!("Failed to read body of {}: {}", url, e)))?
            .to_vec();
        Ok(HttpResponse { status, body })
    }

    fn download(&self, url: &str, dest: &Path) -> CladetimeResult<u64> {
        info!(url, dest = %dest.display(), "Downloading");
        let mut response = self.send(url)?;
        if !response.status().is_success() {
            return Err(CladetimeError::Network(format!(
                "Download of {} returned status: {}",
                url,
                response.status()
            )));
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(dest)?);
        let bytes = response
            .copy_to(&mut writer)
            .map_err(|e| CladetimeError::Network(format!("Failed to stream {}: {}", url, e)))?;
        writer.flush()?;

        debug!(url, bytes, "Download complete");
        Ok(bytes)
    }
}
