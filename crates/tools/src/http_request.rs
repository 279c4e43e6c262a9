//! HTTP request capability.
//!
//! The URL is checked against the configured allowlist before the
//! transport is touched. Two transports exist: [`ReqwestTransport`] makes
//! real calls, [`MockTransport`] answers with canned responses so the
//! reasoning loop can be exercised end-to-end without network access.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use optimus_core::capability::{Capability, required_str};
use optimus_core::error::CapabilityError;
use optimus_security::UrlAllowlist;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

const METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// A request that passed policy.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    pub method: String,
    pub url: String,
    /// JSON body, sent for any method when present
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Sends an [`HttpCall`]. Failures are upstream failures.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, call: HttpCall) -> Result<HttpResponse, CapabilityError>;
}

pub struct HttpRequestCapability {
    allowlist: UrlAllowlist,
    transport: Box<dyn HttpTransport>,
}

impl HttpRequestCapability {
    pub fn new(allowlist: UrlAllowlist, transport: Box<dyn HttpTransport>) -> Self {
        Self {
            allowlist,
            transport,
        }
    }
}

#[async_trait]
impl Capability for HttpRequestCapability {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Perform an HTTP request to an allowed URL and return the response status code, \
         headers and body."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "method": {
                    "type": "string",
                    "description": "HTTP method",
                    "enum": METHODS,
                },
                "url": {
                    "type": "string",
                    "description": "The URL to send the request to. Must match an allowed prefix."
                },
                "body": {
                    "type": "object",
                    "description": "Optional JSON body"
                }
            },
            "required": ["method", "url"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, CapabilityError> {
        let url = required_str(&arguments, "url")?;
        let method = required_str(&arguments, "method")?.to_uppercase();

        if !METHODS.contains(&method.as_str()) {
            return Err(CapabilityError::InvalidArguments(format!(
                "Invalid HTTP method: {method}. Must be GET, POST, PUT, PATCH, or DELETE."
            )));
        }

        self.allowlist
            .check(url)
            .map_err(|e| CapabilityError::PolicyViolation(e.to_string()))?;

        let body = arguments.get("body").filter(|b| !b.is_null()).cloned();

        let start = Instant::now();
        let response = self
            .transport
            .send(HttpCall {
                method: method.clone(),
                url: url.to_string(),
                body,
            })
            .await?;
        debug!(
            method = %method,
            url = %url,
            status = response.status_code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "HTTP request complete"
        );

        serde_json::to_value(&response).map_err(|e| CapabilityError::UpstreamFailure(e.to_string()))
    }
}

/// Live transport over `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::UpstreamFailure(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, call: HttpCall) -> Result<HttpResponse, CapabilityError> {
        let method = reqwest::Method::from_bytes(call.method.as_bytes())
            .map_err(|e| CapabilityError::InvalidArguments(e.to_string()))?;

        let mut request = self.client.request(method, &call.url);
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CapabilityError::UpstreamFailure(format!("HTTP request failed: {e}")))?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| CapabilityError::UpstreamFailure(format!("Failed to read response body: {e}")))?;

        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }
}

/// Deterministic canned responses, no network.
pub struct MockTransport;

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, call: HttpCall) -> Result<HttpResponse, CapabilityError> {
        Ok(mock_response(&call))
    }
}

fn mock_response(call: &HttpCall) -> HttpResponse {
    let mut headers = BTreeMap::new();
    headers.insert("content-type".to_string(), "application/json".to_string());
    headers.insert("x-mock".to_string(), "true".to_string());

    let lower_url = call.url.to_lowercase();
    if lower_url.contains("404") || lower_url.contains("notfound") {
        return HttpResponse {
            status_code: 404,
            headers,
            body: json!({ "message": "Not found" }).to_string(),
        };
    }

    let (status_code, body) = match call.method.as_str() {
        "POST" => (
            201,
            json!({
                "id": simple_hash(&call.body.as_ref().map(Value::to_string).unwrap_or_default()) % 10000,
                "created": true,
                "received": call.body,
            }),
        ),
        "PUT" | "PATCH" => (200, json!({ "updated": true, "received": call.body })),
        "DELETE" => (200, json!({ "deleted": true })),
        _ => (200, json!({ "url": call.url, "mock": true })),
    };

    HttpResponse {
        status_code,
        headers,
        body: body.to_string(),
    }
}

fn simple_hash(s: &str) -> u64 {
    s.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
}
