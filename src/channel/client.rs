//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Optional bearer token authentication
//! - Mapping of HTTP status codes onto [`ChannelError`]
//!
//! Each call makes exactly one request; retries belong to the caller
//! through [`crate::retry::with_retry`].

use crate::error::ChannelError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("shipmod/", env!("CARGO_PKG_VERSION"));

/// HTTP client wrapper with channel error mapping
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, ChannelError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ChannelError::network_error(
                    "",
                    "HTTP client",
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            token: None,
        })
    }

    /// Authenticate every request with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// Whether a token is configured
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        subject: &str,
        channel: &str,
    ) -> Result<Response, ChannelError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                ChannelError::Timeout {
                    subject: subject.to_string(),
                    channel: channel.to_string(),
                }
            } else {
                ChannelError::network_error(subject, channel, e.to_string())
            }
        })?;

        check_status(response, subject, channel).await
    }

    /// GET a URL and decode its JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        subject: &str,
        channel: &str,
    ) -> Result<T, ChannelError> {
        let response = self.send(self.client.get(url), subject, channel).await?;
        response.json::<T>().await.map_err(|e| {
            ChannelError::invalid_response(subject, channel, format!("failed to parse JSON: {}", e))
        })
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        subject: &str,
        channel: &str,
    ) -> Result<T, ChannelError> {
        let response = self
            .send(self.client.post(url).json(body), subject, channel)
            .await?;
        response.json::<T>().await.map_err(|e| {
            ChannelError::invalid_response(subject, channel, format!("failed to parse JSON: {}", e))
        })
    }

    /// DELETE a URL
    pub async fn delete(
        &self,
        url: &str,
        subject: &str,
        channel: &str,
    ) -> Result<(), ChannelError> {
        self.send(self.client.delete(url), subject, channel).await?;
        Ok(())
    }
}

async fn check_status(
    response: Response,
    subject: &str,
    channel: &str,
) -> Result<Response, ChannelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0"));
    if rate_limited {
        return Err(ChannelError::RateLimitExceeded {
            channel: channel.to_string(),
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body, subject, channel))
}

fn status_error(status: StatusCode, body: &str, subject: &str, channel: &str) -> ChannelError {
    match status {
        StatusCode::NOT_FOUND => ChannelError::not_found(subject, channel),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChannelError::AuthenticationError {
            channel: channel.to_string(),
            message: format!("HTTP {}", status),
        },
        _ => {
            let detail = body.trim();
            let message = if detail.is_empty() {
                format!("HTTP {}", status)
            } else {
                format!("HTTP {}: {}", status, detail)
            };
            ChannelError::network_error(subject, channel, message)
        }
    }
}
