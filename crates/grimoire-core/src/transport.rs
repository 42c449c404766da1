//! Transport to the account store
//!
//! `AccountClient` talks to the store only through the `Transport` trait,
//! so the sync engine can run against an in-memory store in tests.
//! `HttpTransport` is the production implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{TransportError, TransportResult};

/// Requests the account client needs from the store
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// GET a JSON document; `None` for an empty or `null` body
    async fn get_json(&self, path: &str) -> TransportResult<Option<Value>>;

    /// POST a JSON body (a single object or an array of objects)
    async fn post_json(&self, path: &str, body: &Value) -> TransportResult<()>;

    /// DELETE a resource
    async fn delete(&self, path: &str) -> TransportResult<()>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for the configured account URL and timeout
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.account_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn classify(&self, method: &'static str, path: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                method,
                path: path.to_string(),
                timeout: self.timeout,
            }
        } else if let Some(status) = err.status() {
            TransportError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
            }
        } else {
            TransportError::Request {
                method,
                path: path.to_string(),
                message: err.to_string(),
            }
        }
    }

    fn check(
        &self,
        method: &'static str,
        path: &str,
        response: Response,
    ) -> TransportResult<Response> {
        response
            .error_for_status()
            .map_err(|e| self.classify(method, path, e))
    }
}

impl Transport for HttpTransport {
    async fn get_json(&self, path: &str) -> TransportResult<Option<Value>> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.classify("GET", path, e))?;
        let body = self
            .check("GET", path, response)?
            .text()
            .await
            .map_err(|e| self.classify("GET", path, e))?;

        parse_body(path, &body)
    }

    async fn post_json(&self, path: &str, body: &Value) -> TransportResult<()> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify("POST", path, e))?;
        self.check("POST", path, response)?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> TransportResult<()> {
        debug!("DELETE {}", path);
        let response = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .map_err(|e| self.classify("DELETE", path, e))?;
        self.check("DELETE", path, response)?;
        Ok(())
    }
}

fn parse_body(path: &str, body: &str) -> TransportResult<Option<Value>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(body).map_err(|source| TransportError::Decode {
        path: path.to_string(),
        source,
    })?;
    Ok(if value.is_null() { None } else { Some(value) })
}
