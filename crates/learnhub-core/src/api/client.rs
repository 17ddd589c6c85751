//! Shared API client for the LearnHub REST backend.
//!
//! Every request goes through two interceptors:
//! - request side: attach `Authorization: Bearer <token>` unless the path is
//!   an authentication endpoint
//! - response side: hand a 401 on a protected request to the registered
//!   `AuthHandler`, which may refresh the token so the request can be
//!   re-issued once
//!
//! The client never depends on the session module. The session registers
//! itself as the `AuthHandler` at startup.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::request::ApiRequest;
use super::transport::{HttpRequest, Transport};
use super::ApiError;

/// Hooks the client calls into for token lookup and 401 recovery.
#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Token to use when no default header has been set on the client
    fn access_token(&self) -> Option<String>;

    /// A protected request got its first 401. Return a fresh access token to
    /// re-issue the request with, or the error to reject it with.
    async fn refresh_access_token(&self) -> Result<String, ApiError>;

    /// A request that was already re-issued after a refresh got 401 again.
    /// Returns the error the caller should see.
    async fn retry_rejected(&self) -> ApiError;
}

/// API client for the LearnHub backend.
/// Clone is cheap - clones share the transport, default header and handler.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    default_token: Arc<RwLock<Option<String>>>,
    auth_handler: Arc<RwLock<Option<Arc<dyn AuthHandler>>>>,
}

impl ApiClient {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_token: Arc::new(RwLock::new(None)),
            auth_handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the default bearer token for authenticated requests
    pub fn set_token(&self, token: String) {
        *self
            .default_token
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(token);
    }

    /// Remove the default bearer token
    pub fn clear_token(&self) {
        *self
            .default_token
            .write()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn token(&self) -> Option<String> {
        self.default_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Register the token getter / 401 handler. Replaces any previous one.
    pub fn register_auth_handler(&self, handler: Arc<dyn AuthHandler>) {
        *self
            .auth_handler
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    fn handler(&self) -> Option<Arc<dyn AuthHandler>> {
        self.auth_handler
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Resolve the bearer token for a request: retry override, then the
    /// default header, then the registered getter.
    fn bearer_for(&self, request: &ApiRequest) -> Option<String> {
        if request.is_auth_endpoint() {
            return None;
        }
        request
            .token_override()
            .map(str::to_string)
            .or_else(|| self.token())
            .or_else(|| self.handler().and_then(|h| h.access_token()))
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<super::transport::HttpResponse, ApiError> {
        let http = HttpRequest {
            method: request.method().clone(),
            url: format!("{}{}", self.base_url, request.path()),
            authorization: self.bearer_for(request).map(|t| format!("Bearer {}", t)),
            body: request.body().cloned(),
        };
        debug!(method = %http.method, path = request.path(), retry = request.retries(), "Sending request");
        self.transport.send(http).await
    }

    /// Send a request through both interceptors and return the raw body of
    /// the successful response.
    pub async fn execute(&self, request: ApiRequest) -> Result<String, ApiError> {
        let mut request = request;
        loop {
            let response = self.dispatch(&request).await?;
            if response.status.is_success() {
                return Ok(response.body);
            }

            if response.status == StatusCode::UNAUTHORIZED && !request.is_auth_endpoint() {
                if let Some(handler) = self.handler() {
                    if request.is_retry() {
                        warn!(path = request.path(), "Request rejected again after token refresh");
                        return Err(handler.retry_rejected().await);
                    }
                    let token = handler.refresh_access_token().await?;
                    request = request.into_retry(token);
                    continue;
                }
            }

            return Err(ApiError::from_status(response.status, &response.body));
        }
    }

    /// Send a request and decode the JSON response. An empty body decodes as
    /// JSON `null`, so `()` and `serde_json::Value` accept bodiless replies.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path().to_string();
        let body = self.execute(request).await?;
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).json(body)?).await
    }
}
