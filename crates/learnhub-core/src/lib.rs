//! Core library for the LearnHub client.
//!
//! Holds the authenticated session, the shared API client and the models
//! the front ends render.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionManager, SessionSnapshot};
pub use config::Config;
