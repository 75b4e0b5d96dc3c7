//! HTTP client for writing points to InfluxDB.

use crate::line_protocol::{self, EncodeError, Point};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Writing data to InfluxDB failed with status {status}: {body}")]
    ServerError { status: StatusCode, body: String },
    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

/// Configuration for the InfluxDB client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://127.0.0.1:8186`
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            username: None,
            password: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn write_url(&self) -> String {
        format!("{}/write", self.url.trim_end_matches('/'))
    }

    fn query(&self) -> Vec<(&'static str, &str)> {
        let mut query = vec![("precision", "s"), ("db", self.database.as_str())];
        if let (Some(u), Some(p)) = (&self.username, &self.password) {
            query.push(("u", u.as_str()));
            query.push(("p", p.as_str()));
        }
        query
    }
}

/// Client for the InfluxDB 1.x write endpoint.
pub struct InfluxClient {
    client: Client,
    config: ClientConfig,
}

impl InfluxClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    /// Write a batch in a single request. Returns the number of lines sent.
    pub async fn write(&self, measurement: &str, points: &[Point]) -> Result<usize, ClientError> {
        let body = line_protocol::encode_batch(measurement, points)?;

        tracing::debug!("Writing {} points to {}", points.len(), self.config.write_url());

        let response = self
            .client
            .post(self.config.write_url())
            .query(&self.config.query())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(points.len());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::ServerError { status, body })
    }
}
