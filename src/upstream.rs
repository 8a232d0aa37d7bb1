//! Outbound HTTP to the world-hosting and asset APIs.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use reqwest::Method;
use std::time::Duration;

use crate::error::{AppError, Result};

/// A single outbound request. Headers are applied in order.
#[derive(Clone, Debug)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }
}

/// Transport seam: returns the body of a 2xx response, or `UpstreamFetch`.
pub trait Upstream: Send + Sync {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<Bytes>>;
}

/// reqwest-backed transport used by the server.
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("VibeVerse-Server")
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Upstream for HttpUpstream {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            let mut builder = self.client.request(request.method.clone(), &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(*name, value);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| AppError::upstream(&request.url, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::upstream(
                    &request.url,
                    format!("Bad status code: {}", status.as_u16()),
                ));
            }

            response
                .bytes()
                .await
                .map_err(|e| AppError::upstream(&request.url, e))
        })
    }
}
