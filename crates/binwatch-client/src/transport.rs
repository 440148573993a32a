//! HTTP transport with bounded retry.
//!
//! [`Transport`] owns the `reqwest` client, the authority base URL,
//! and the retry policy. It has no business knowledge: callers name a
//! path and a response type, and the transport performs the call,
//! retrying transport-level failures (connection errors, non-success
//! statuses) per the policy.
//!
//! Body decoding happens *after* the retry loop: once well-formed
//! bytes arrive, retrying would only fetch the same payload again, so
//! a decode failure surfaces immediately as
//! [`TransportError::Decode`].

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::TransportError;
use crate::retry::{RetryPolicy, with_retry};

/// HTTP transport to the authority.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl Transport {
    /// Create a transport for the given base URL.
    ///
    /// A trailing slash on the base URL is stripped so paths can
    /// always be written with a leading slash.
    pub fn new(base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            policy,
        }
    }

    /// The configured base URL (without trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a GET and decode the JSON response body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.request_json(Method::GET, path).await
    }

    /// Perform a bodyless POST and decode the JSON response body.
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.request_json(Method::POST, path).await
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<T, TransportError> {
        let url = format!("{}{path}", self.base_url);
        let body = self.request_text(method, &url, path).await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode {
            url,
            reason: e.to_string(),
        })
    }

    /// Fetch the raw response body, retrying transport failures.
    async fn request_text(
        &self,
        method: Method,
        url: &str,
        operation: &str,
    ) -> Result<String, TransportError> {
        with_retry(&self.policy, operation, |attempt| {
            let method = method.clone();
            async move {
                debug!(%method, url, attempt, "sending request");
                let response = self
                    .http
                    .request(method, url)
                    .send()
                    .await
                    .map_err(|e| TransportError::Request {
                        url: url.to_owned(),
                        reason: e.to_string(),
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(TransportError::Status {
                        url: url.to_owned(),
                        status: status.as_u16(),
                    });
                }

                response.text().await.map_err(|e| TransportError::Request {
                    url: url.to_owned(),
                    reason: e.to_string(),
                })
            }
        })
        .await
    }
}
