//! REST API client module for the LearnHub backend.
//!
//! This module provides the `ApiClient` used for every backend call, the
//! `ApiRequest` descriptor it sends, and the `Transport` seam underneath.
//!
//! The backend uses JWT bearer authentication. Tokens are obtained from the
//! `/auth/` endpoints and refreshed through the `AuthHandler` hook.

pub mod client;
pub mod error;
pub mod request;
pub mod services;
pub mod transport;

pub use client::{ApiClient, AuthHandler};
pub use error::ApiError;
pub use request::ApiRequest;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
