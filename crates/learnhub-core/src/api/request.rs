use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// Path fragment identifying authentication endpoints. These never carry a
/// bearer token and never enter the refresh cycle.
pub const AUTH_PATH_MARKER: &str = "/auth/";

/// Description of one API call, independent of any HTTP library.
///
/// A request is re-issued at most once after a token refresh; `retries`
/// records that, and `token_override` carries the freshly minted token for
/// the re-issued call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    retries: u32,
    token_override: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        // The backend routes mutating requests only with a trailing slash
        if is_mutating(&method) && !path.ends_with('/') {
            path.push('/');
        }
        Self {
            method,
            path,
            body: None,
            retries: 0,
            token_override: None,
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

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_retry(&self) -> bool {
        self.retries > 0
    }

    pub fn token_override(&self) -> Option<&str> {
        self.token_override.as_deref()
    }

    pub fn is_auth_endpoint(&self) -> bool {
        self.path.contains(AUTH_PATH_MARKER)
    }

    /// The same request, marked as a retry and carrying the new access token
    pub fn into_retry(mut self, token: String) -> Self {
        self.retries += 1;
        self.token_override = Some(token);
        self
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
