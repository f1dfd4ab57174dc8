//! Recording in-memory transport.

use std::collections::HashMap;
use std::sync::Mutex;

use pact_extensions::{Error, FetchRequest, Result, Transport};

#[derive(Debug, Clone)]
enum Reply {
    Body(Vec<u8>),
    Status(u16),
    Failure(String),
}

/// A [`Transport`] serving canned replies by exact URL.
///
/// Unknown URLs answer HTTP 404. Every request is recorded so tests can
/// assert on what was (or was not) fetched.
#[derive(Debug, Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.set(url, Reply::Body(body.as_bytes().to_vec()));
        self
    }

    pub fn with_bytes(self, url: &str, body: Vec<u8>) -> Self {
        self.set(url, Reply::Body(body));
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.set(url, Reply::Status(status));
        self
    }

    /// Fail at the connection level, before any status is known.
    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.set(url, Reply::Failure(message.to_string()));
        self
    }

    /// Change a reply after construction, e.g. to publish a new release.
    pub fn set_text(&self, url: &str, body: &str) {
        self.set(url, Reply::Body(body.as_bytes().to_vec()));
    }

    pub fn set_bytes(&self, url: &str, body: Vec<u8>) {
        self.set(url, Reply::Body(body));
    }

    fn set(&self, url: &str, reply: Reply) {
        self.replies
            .lock()
            .expect("replies lock")
            .insert(url.to_string(), reply);
    }

    /// All requests made so far, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Number of requests made for `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|request| request.url == url)
            .count()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().expect("requests lock").clear();
    }
}

impl Transport for FakeTransport {
    fn get_bytes(&self, request: &FetchRequest) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .get(&request.url)
            .cloned()
            .unwrap_or(Reply::Status(404));

        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(Error::Network {
                url: request.url.clone(),
                status: Some(status),
                message: format!("HTTP {status}"),
            }),
            Reply::Failure(message) => Err(Error::Network {
                url: request.url.clone(),
                status: None,
                message,
            }),
        }
    }
}
