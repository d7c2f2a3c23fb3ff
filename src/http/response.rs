//! Captured outbound responses.
//!
//! Every client call returns a fully buffered [`Response`] so the retry
//! loop can inspect the status before the caller sees anything.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Version};
use serde::de::DeserializeOwned;
use url::Url;

/// The request that produced a [`Response`].
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

/// A complete HTTP response, body included.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Declared `Content-Length`, when the server sent one.
    pub content_length: Option<u64>,
    /// Time from sending the request to the end of the body.
    pub duration: Duration,
    pub request: RequestSummary,
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Status line as rendered on the wire, e.g. "200 OK".
    pub fn status_line(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {}", self.status.as_u16(), reason),
            None => self.status.as_u16().to_string(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 2xx.
pub fn is_successful(code: u16) -> bool {
    in_range(code, 200, 300)
}

/// 4xx.
pub fn is_client_error(code: u16) -> bool {
    in_range(code, 400, 500)
}

/// 5xx.
pub fn is_server_error(code: u16) -> bool {
    in_range(code, 500, 600)
}

fn in_range(code: u16, low: u16, high: u16) -> bool {
    low <= code && code < high
}
