//! Fetching version documents and assets over HTTP.

use std::time::Duration;

use crate::{Error, Result};

/// Request timeout applied to every fetch.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// User agent sent with every request; the GitHub API rejects requests without one.
pub const USER_AGENT: &str = "pact-cli";

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach `Authorization: Bearer` from `GITHUB_TOKEN` or `GH_TOKEN`, if set.
    pub fn with_github_token(self) -> Self {
        let token = ["GITHUB_TOKEN", "GH_TOKEN"]
            .into_iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|token| !token.trim().is_empty());
        match token {
            Some(token) => self.header("Authorization", format!("Bearer {}", token.trim())),
            None => self,
        }
    }
}

/// Fetches URLs. Non-success statuses are [`Error::Network`] carrying the status.
pub trait Transport {
    fn get_bytes(&self, request: &FetchRequest) -> Result<Vec<u8>>;

    fn get_text(&self, request: &FetchRequest) -> Result<String> {
        let bytes = self.get_bytes(request)?;
        String::from_utf8(bytes).map_err(|e| Error::Parse {
            url: request.url.clone(),
            message: format!("response is not UTF-8: {e}"),
        })
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn get_bytes(&self, request: &FetchRequest) -> Result<Vec<u8>> {
        (**self).get_bytes(request)
    }

    fn get_text(&self, request: &FetchRequest) -> Result<String> {
        (**self).get_text(request)
    }
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Network {
                url: String::new(),
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get_bytes(&self, request: &FetchRequest) -> Result<Vec<u8>> {
        tracing::debug!(url = %request.url, "GET");

        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let network = |status: Option<u16>, message: String| Error::Network {
            url: request.url.clone(),
            status,
            message,
        };

        let response = builder.send().map_err(|e| network(None, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(network(Some(status.as_u16()), format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .map_err(|e| network(Some(status.as_u16()), e.to_string()))?;
        tracing::debug!(url = %request.url, bytes = bytes.len(), "Fetched");
        Ok(bytes.to_vec())
    }
}
