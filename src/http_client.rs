use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthManager;
use crate::endpoints;
use crate::error::{GatewayError, Result};

/// Outbound request descriptor
///
/// Paths are relative to the gateway's base URL (`/profiles/abc123`). A
/// missing leading `/` is added.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        Self {
            method,
            path,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter when a value is present
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Whether the endpoint is reachable without credentials
    pub fn is_public(&self) -> bool {
        endpoints::is_public(&self.method, &self.path)
    }

    /// Token carried in the Authorization header, if any
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Replace any Authorization header with a bearer token
    pub fn set_bearer(&mut self, token: &str) -> Result<()> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            GatewayError::InvalidRequest("access token is not a valid header value".to_string())
        })?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Per-call bookkeeping for the refresh-and-retry cycle
struct Attempt {
    request: ApiRequest,
    /// Set once the request has been resent after a refresh
    retried: bool,
    /// Refresh generation observed before the first send
    generation: u64,
    /// Short id tying together the log lines of one logical request
    request_id: String,
}

/// HTTP client for the wiki API with credential attachment and refresh-on-401
pub struct GatewayClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// API base URL, without trailing slash
    base_url: String,

    /// Authentication manager
    auth: Arc<AuthManager>,
}

impl GatewayClient {
    /// Create a new gateway client
    pub fn new(
        auth: Arc<AuthManager>,
        base_url: &str,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(default_headers)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    /// Attach the stored access token to a protected request
    ///
    /// Public requests and requests made while no token is stored are
    /// returned unchanged.
    pub fn attach_credentials(&self, mut request: ApiRequest) -> Result<ApiRequest> {
        if request.is_public() {
            return Ok(request);
        }

        if let Some(token) = self.auth.access_token()? {
            request.set_bearer(&token)?;
        }

        Ok(request)
    }

    /// Send a request through the gateway
    ///
    /// A protected request answered with 401 triggers one refresh; on a new
    /// token it is resent once and that outcome is returned. Every other
    /// failure, and a 401 on the resend, is returned as is.
    pub async fn send(&self, request: ApiRequest) -> Result<Response> {
        // Read the generation before the token so a stale pairing is impossible
        let generation = self.auth.generation();
        let mut attempt = Attempt {
            request: self.attach_credentials(request)?,
            retried: false,
            generation,
            request_id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
        };
        let public = attempt.request.is_public();

        loop {
            match self.execute(&attempt).await {
                Ok(response) => return Ok(response),

                Err(err @ GatewayError::Unauthorized(_)) if !public && !attempt.retried => {
                    attempt.retried = true;
                    tracing::warn!(
                        request_id = %attempt.request_id,
                        "Received 401, refreshing token and retrying..."
                    );

                    match self.auth.refresh(attempt.generation).await {
                        Some(token) => {
                            attempt.request.set_bearer(&token)?;
                            continue;
                        }
                        None => {
                            tracing::warn!(
                                request_id = %attempt.request_id,
                                "Refresh denied, returning original 401"
                            );
                            return Err(err);
                        }
                    }
                }

                Err(err) => return Err(err),
            }
        }
    }

    /// Send and decode a JSON response body
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Execute a single attempt against the transport
    async fn execute(&self, attempt: &Attempt) -> Result<Response> {
        let request = &attempt.request;
        let url = format!("{}{}", self.base_url, request.path);

        tracing::debug!(
            request_id = %attempt.request_id,
            method = %request.method,
            path = %request.path,
            retry = attempt.retried,
            authorized = request.bearer_token().is_some(),
            "Sending HTTP request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                // Categorize the error for better debugging
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection_failed"
                } else if e.is_request() {
                    "request_error"
                } else if e.is_body() {
                    "body_error"
                } else {
                    "unknown"
                };

                tracing::warn!(
                    request_id = %attempt.request_id,
                    error_kind = error_kind,
                    error = %e,
                    url = %url,
                    "HTTP request error"
                );
                return Err(GatewayError::Network(e));
            }
        };

        let status = response.status();
        tracing::debug!(
            request_id = %attempt.request_id,
            status = %status,
            "Received HTTP response"
        );

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        let message = error_message(&error_text, status);

        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized(message));
        }

        tracing::warn!(
            request_id = %attempt.request_id,
            status = status.as_u16(),
            path = %request.path,
            response_body = %error_text,
            "HTTP request failed with error response"
        );
        Err(GatewayError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull `{"message": "..."}` out of an error body, falling back to the raw text
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
