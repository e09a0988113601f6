use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

mod client;
mod error;

pub use client::HttpClient;
pub use error::{Error, HttpTransportErrorKind, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status >= 400
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: http::Method, url: String) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }

    pub fn get(url: String) -> Self {
        Self::new(http::Method::GET, url)
    }

    pub fn delete(url: String) -> Self {
        Self::new(http::Method::DELETE, url)
    }

    pub fn post_json<T: Serialize + ?Sized>(url: String, body: &T) -> Result<Self> {
        Self::new(http::Method::POST, url).with_json(body)
    }

    pub fn put_json<T: Serialize + ?Sized>(url: String, body: &T) -> Result<Self> {
        Self::new(http::Method::PUT, url).with_json(body)
    }

    fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)?;
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self.body = Bytes::from(bytes);
        Ok(self)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Join a base URL (`http://host:port[/prefix]`) and an absolute request path.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
