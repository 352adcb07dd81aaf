//! Resilient HTTP transport for one content service instance
//!
//! Every remote call goes through [`Transport::execute`], which applies the
//! retry policy from [`crate::retry`]:
//! - 429: wait for `Retry-After` (or the backoff delay) and retry
//! - 5xx: retry with backoff; once attempts run out the last response is
//!   returned, not raised
//! - connection faults: retry with backoff; once attempts run out the error
//!   is fatal
//!
//! Non-success responses are returned as [`HttpResponse`] values. Callers
//! turn them into errors with [`HttpResponse::error_for_status`] where a
//! success is required.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::InstanceConfig;
use crate::error::{MigrateError, Result};
use crate::retry::{AttemptOutcome, Observation, RetryConfig, Sleeper, TokioSleeper, parse_retry_after};

/// Multipart field name for uploaded files
const UPLOAD_FIELD: &str = "file";

/// Content type attached to every uploaded file
const UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// Request payload. Kept as plain data so it can be rebuilt for every attempt.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    File { filename: String, payload: Bytes },
}

/// One logical request, possibly sent several times
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub body: RequestBody,
    pub headers: Vec<(&'static str, String)>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: RequestBody::Empty,
            headers: Vec::new(),
        }
    }

    pub fn json(method: Method, url: Url, body: serde_json::Value) -> Self {
        Self {
            method,
            url,
            body: RequestBody::Json(body),
            headers: Vec::new(),
        }
    }

    pub fn file(url: Url, filename: impl Into<String>, payload: Bytes) -> Self {
        Self {
            method: Method::POST,
            url,
            body: RequestBody::File {
                filename: filename.into(),
                payload,
            },
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub method: Method,
    pub url: Url,
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert a non-2xx response into [`MigrateError::Status`]
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(MigrateError::Status {
            method: self.method.to_string(),
            url: self.url.to_string(),
            status: self.status,
            body: String::from_utf8_lossy(&self.body).chars().take(512).collect(),
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| MigrateError::Decode {
            url: self.url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Credentials and HTTP client for one instance
pub struct Transport {
    client: reqwest::Client,
    username: String,
    api_token: String,
    retry: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("username", &self.username)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Creates a transport with a per-request `timeout`.
    pub fn new(instance: &InstanceConfig, retry: RetryConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(MigrateError::ClientBuild)?;

        Ok(Self {
            client,
            username: instance.username.clone(),
            api_token: instance.api_token.clone(),
            retry,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the backoff sleeper. Tests use this to avoid real delays.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Send `request`, retrying transient failures.
    ///
    /// Returns `Ok` for any response the remote produced (including 4xx and
    /// an exhausted 5xx/429) and `Err(MigrateError::Connection)` when no
    /// response could be obtained within the attempt budget.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);

            let observation = match self.send_once(request).await? {
                Ok(response) => Observation::Response {
                    status: response.status,
                    retry_after: response.retry_after,
                    response,
                },
                Err(fault) => Observation::ConnectionFault(fault),
            };

            match self.retry.evaluate(attempt, observation) {
                AttemptOutcome::Complete(response) => return Ok(response),
                AttemptOutcome::Retry(wait) => {
                    tracing::debug!(
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        wait = ?wait,
                        "transient failure, backing off"
                    );
                    self.sleeper.sleep(wait).await;
                }
                AttemptOutcome::Fatal(source) => {
                    return Err(MigrateError::Connection {
                        url: request.url.to_string(),
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }

    /// One attempt. The outer `Result` is a request that could not even be
    /// built (never retried); the inner one separates a read response from a
    /// connection-level fault.
    async fn send_once(
        &self,
        request: &HttpRequest,
    ) -> Result<std::result::Result<HttpResponse, reqwest::Error>> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .basic_auth(&self.username, Some(&self.api_token));

        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::File { filename, payload } => {
                let part = Part::bytes(payload.to_vec())
                    .file_name(filename.clone())
                    .mime_str(UPLOAD_CONTENT_TYPE)
                    .map_err(|source| MigrateError::RequestBuild {
                        method: request.method.to_string(),
                        url: request.url.to_string(),
                        source,
                    })?;
                builder.multipart(Form::new().part(UPLOAD_FIELD, part))
            }
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(fault) => return Ok(Err(fault)),
        };

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        // A body that cannot be read counts as a connection fault.
        match response.bytes().await {
            Ok(body) => Ok(Ok(HttpResponse {
                method: request.method.clone(),
                url: request.url.clone(),
                status,
                retry_after,
                body,
            })),
            Err(fault) => Ok(Err(fault)),
        }
    }
}
