//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: login, registration, logout and token refresh
//! - `SessionStorage`: persisted tokens and user record (file, keychain or memory)
//! - `RouteGuard`: role/approval checks for protected views
//!
//! Access tokens are refreshed at most three times between logins.

pub mod error;
pub mod guard;
pub mod navigation;
pub mod session;
pub mod storage;

pub use error::SessionError;
pub use guard::{GuardDecision, RouteGuard};
pub use navigation::{Navigator, RecordingNavigator};
pub use session::{
    Credentials, Registration, SessionManager, SessionOptions, SessionPhase, SessionSnapshot,
    MAX_REFRESH_ATTEMPTS,
};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, SessionStorage, StoredSession};
