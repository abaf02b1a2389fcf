//! HTTP client infrastructure for the camera server API.
//!
//! Thin wrapper around reqwest that normalizes the base URL, applies a
//! per-request timeout, and maps transport failures onto
//! [`HttpClientError`] so callers can classify outcomes without touching
//! reqwest types.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde::{de::DeserializeOwned, Serialize};

/// Error type for HTTP client operations.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
    /// Connection failed
    #[error("Connection error: {0}")]
    Connection(String),
    /// Request timed out
    #[error("Timeout")]
    Timeout,
    /// Server returned an error status
    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },
}

impl From<reqwest::Error> for HttpClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpClientError::Timeout
        } else if err.is_connect() {
            HttpClientError::Connection(err.to_string())
        } else {
            HttpClientError::Http(err.to_string())
        }
    }
}

/// JSON-over-HTTP client with a normalized base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client for `base_url` with the given per-request timeout.
    ///
    /// Trailing slashes on the base URL are stripped so paths can always be
    /// joined with a leading `/`. The timeout covers the whole request for
    /// JSON calls; streaming requests apply it to connection setup only.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    pub async fn post<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, HttpClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    /// POST an empty JSON object, used by the reset endpoints.
    pub async fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R, HttpClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// GET a long-lived byte stream (the MJPEG feed).
    ///
    /// The client-wide timeout would kill an open stream, so this request is
    /// sent with the timeout disabled once the response status has been
    /// checked. Read errors surface as items on the returned stream.
    pub async fn get_stream(
        &self,
        path_and_query: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, HttpClientError>>, HttpClientError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(60 * 60 * 24))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpClientError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(HttpClientError::from))
            .boxed())
    }

    async fn decode<R: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<R, HttpClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpClientError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| HttpClientError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let client = HttpClient::new("http://localhost:5000/", Duration::from_secs(10));
        assert_eq!(client.base_url(), "http://localhost:5000");

        let client = HttpClient::new("http://localhost:5000", Duration::from_secs(10));
        assert_eq!(client.base_url(), "http://localhost:5000");
    }
}
