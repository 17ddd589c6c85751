use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The backend refused the request and said why
    #[error("{0}")]
    Rejected(String),

    #[error("Session expired. Please log in again.")]
    SessionExpired,

    #[error("Session manager has been shut down")]
    ShutDown,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SessionError {
    /// Classify a failed login/register call. A 401 only means bad
    /// credentials when the endpoint checks them (login).
    pub(crate) fn from_auth_failure(err: ApiError, credentials_checked: bool) -> Self {
        match err {
            ApiError::Unauthorized if credentials_checked => SessionError::InvalidCredentials,
            ApiError::SessionExpired => SessionError::SessionExpired,
            other => match other.detail() {
                Some(detail) => SessionError::Rejected(detail.to_string()),
                None => SessionError::Api(other),
            },
        }
    }

    /// Message suitable for a form error banner
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            SessionError::Api(_) => fallback.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_401_is_invalid_credentials() {
        let err = SessionError::from_auth_failure(ApiError::Unauthorized, true);
        assert!(matches!(err, SessionError::InvalidCredentials));
        assert_eq!(err.user_message("Login failed"), "Invalid email or password");
    }

    #[test]
    fn test_backend_detail_surfaces_verbatim() {
        let err = SessionError::from_auth_failure(
            ApiError::BadRequest("Password too short".to_string()),
            false,
        );
        assert_eq!(err.user_message("Registration failed"), "Password too short");
    }

    #[test]
    fn test_network_failure_uses_generic_message() {
        let err = SessionError::from_auth_failure(
            ApiError::NetworkError("connection refused".to_string()),
            true,
        );
        assert!(matches!(err, SessionError::Api(_)));
        assert_eq!(err.user_message("Login failed"), "Login failed");

        let err = SessionError::from_auth_failure(ApiError::Unauthorized, false);
        assert_eq!(err.user_message("Registration failed"), "Registration failed");
    }
}
