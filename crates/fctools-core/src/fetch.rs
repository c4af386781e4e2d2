//! Remote resource fetching.
//!
//! Pipelines take a [`Fetcher`] rather than talking to the network
//! directly, which keeps them testable without a live server.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use tracing::{debug, trace};

/// Something that can turn a URL into the text behind it
pub trait Fetcher {
    /// Fetch the body at `url` as UTF-8 text
    fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP(S) fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a default client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("fctools/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::fetch("<client setup>", e))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(url, status.as_u16()));
        }

        let body = response.bytes().map_err(|e| Error::fetch(url, e))?;
        trace!("Fetched {} bytes from {}", body.len(), url);
        decode_body(url, body.to_vec())
    }
}

/// Decode a response body, refusing invalid UTF-8 rather than replacing it
fn decode_body(url: &str, body: Vec<u8>) -> Result<String> {
    String::from_utf8(body).map_err(|e| Error::invalid_encoding(url, e))
}

/// In-memory fetcher for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct StaticFetcher {
    bodies: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl StaticFetcher {
    pub(crate) fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }
}

#[cfg(test)]
impl Fetcher for StaticFetcher {
    fn fetch_text(&self, url: &str) -> Result<String> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| Error::http_status(url, 404))
    }
}
