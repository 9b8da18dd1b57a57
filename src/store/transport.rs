// src/store/transport.rs

//! HTTP transport for store requests
//!
//! Provides a thin trait seam over a blocking reqwest client so the
//! resolver core can be exercised against a scripted transport in tests.
//! The real client retries connection-level failures with a linear backoff;
//! HTTP error statuses are never retried here, they are the caller's to
//! interpret.

use crate::error::{Error, Result};
use crate::store::auth::UserAuth;
use crate::store::CancelToken;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Media type of the v2 store endpoints
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for requests that fail at the connection level
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// A fully shaped outgoing request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub url: Url,
    pub accept: String,
    pub content_type: String,
    pub data: Vec<u8>,
    /// Extra headers beyond content negotiation
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    /// A JSON POST against a v2 endpoint
    pub fn post_json(url: Url, data: Vec<u8>) -> Self {
        RequestOptions {
            method: Method::POST,
            url,
            accept: JSON_CONTENT_TYPE.to_string(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            data,
            headers: Vec::new(),
        }
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A decoded JSON response plus the envelope the core needs
#[derive(Debug, Clone)]
pub struct JsonReply {
    pub status: u16,
    /// Decoded body; `Null` when the status was not a success
    pub body: serde_json::Value,
    pub headers: Vec<(String, String)>,
}

impl JsonReply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One request/response round-trip against the store
pub trait Transport: Send + Sync {
    /// Perform the request, decoding the body as JSON on success statuses.
    ///
    /// Cancellation must be honored at least before the request is sent.
    fn request_json(
        &self,
        cancel: &CancelToken,
        opts: &RequestOptions,
        user: Option<&UserAuth>,
    ) -> Result<JsonReply>;
}

/// Blocking reqwest transport with retry support
pub struct HttpTransport {
    client: Client,
    max_retries: u32,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("cannot create HTTP client: {e}")))?;

        Ok(HttpTransport {
            client,
            max_retries: MAX_RETRIES,
        })
    }
}

impl Transport for HttpTransport {
    fn request_json(
        &self,
        cancel: &CancelToken,
        opts: &RequestOptions,
        user: Option<&UserAuth>,
    ) -> Result<JsonReply> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let mut req = self
                .client
                .request(opts.method.clone(), opts.url.clone())
                .header(CONTENT_TYPE, opts.content_type.as_str())
                .header(ACCEPT, opts.accept.as_str())
                .body(opts.data.clone());
            for (name, value) in &opts.headers {
                req = req.header(name.as_str(), value.as_str());
            }
            if let Some(user) = user {
                if user.has_store_macaroon() {
                    req = req.header(AUTHORIZATION, user.authorization_header().as_str());
                }
            }

            match req.send() {
                Ok(response) => {
                    let status = response.status();
                    let headers = response
                        .headers()
                        .iter()
                        .filter_map(|(name, value)| {
                            value
                                .to_str()
                                .ok()
                                .map(|v| (name.as_str().to_string(), v.to_string()))
                        })
                        .collect();

                    let body = if status.is_success() {
                        response.json::<serde_json::Value>().map_err(|e| {
                            Error::Transport(format!(
                                "cannot decode response from {}: {e}",
                                opts.url
                            ))
                        })?
                    } else {
                        serde_json::Value::Null
                    };

                    return Ok(JsonReply {
                        status: status.as_u16(),
                        body,
                        headers,
                    });
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::Transport(format!(
                            "request to {} failed after {attempt} attempts: {e}",
                            opts.url
                        )));
                    }
                    warn!("request attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}
