//! HTTP executor capability
//!
//! The orchestrator only sees the [`HttpExecutor`] trait. The default
//! implementation sends requests with `reqwest`; tests plug in a scripted
//! executor instead.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info, warn};

use super::method::HttpMethod;
use super::snapshot::ResponseSnapshot;
use crate::common::{Error, Result};

/// Ready-to-send request description
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Test case the request belongs to, for error reporting
    pub case_id: String,
    pub method: HttpMethod,
    /// URL with path parameters already substituted
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub query: BTreeMap<String, String>,
}

impl HttpRequest {
    /// Log the request the way it will go on the wire
    pub fn log(&self) {
        info!(case_id = %self.case_id, method = %self.method, url = %self.url, "Request details");
        info!(case_id = %self.case_id, query = ?self.query, "Query Parameters");
        info!(case_id = %self.case_id, headers = ?self.headers, "Headers");
        if let Some(body) = &self.body {
            info!(case_id = %self.case_id, "Body:\n{}", body);
        }
    }
}

/// Sends a prepared request and captures the response
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<ResponseSnapshot>;
}

/// Client options for [`ReqwestExecutor`]
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Accept invalid TLS certificates (test environments only)
    pub relaxed_https: bool,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            relaxed_https: false,
            timeout: Duration::from_secs(30),
            user_agent: concat!("apiflow/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// `reqwest`-backed executor
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(options: &ExecutorOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone());

        if options.relaxed_https {
            warn!("Using relaxed HTTPS validation. This should only be used for testing purposes.");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn build_headers(request: &HttpRequest) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (key, value) in &request.headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            Error::request_preparation(&request.case_id, format!("Invalid header name `{key}`: {e}"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            Error::request_preparation(
                &request.case_id,
                format!("Invalid header value for `{key}`: {e}"),
            )
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: &HttpRequest) -> Result<ResponseSnapshot> {
        let headers = build_headers(request)?;
        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .headers(headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            if !body.trim().is_empty() {
                builder = builder.body(body.clone());
            }
        }

        info!(case_id = %request.case_id, "Executing {} request to {}", request.method, request.url);
        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| Error::request_execution(&request.case_id, &request.url, e.to_string()))?;
        let elapsed = started.elapsed();

        let status = response.status().as_u16();
        let mut response_headers = BTreeMap::new();
        for (name, value) in response.headers() {
            response_headers.insert(
                name.to_string(),
                value.to_str().unwrap_or("<binary>").to_string(),
            );
        }

        let bytes = response.bytes().await.map_err(|e| {
            Error::request_execution(
                &request.case_id,
                &request.url,
                format!("Failed to read response: {e}"),
            )
        })?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        debug!(case_id = %request.case_id, status, "Received response");

        Ok(ResponseSnapshot::new(status, response_headers, body).with_elapsed(elapsed))
    }
}
