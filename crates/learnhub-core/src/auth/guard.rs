//! Route guards: decide whether a protected view may render for the
//! current session snapshot.

use crate::models::Role;

use super::session::SessionSnapshot;

pub const DEFAULT_LOGIN_PATH: &str = "/login";
const VERIFY_EMAIL_PATH: &str = "/verify-email";
const STUDENT_FALLBACK_PATH: &str = "/profile";
const UNAUTHORIZED_PATH: &str = "/unauthorized";
const PENDING_APPROVAL_PATH: &str = "/educator/pending-approval";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session restoration or an auth call is still in flight; show a spinner
    Pending,
    Allow,
    /// Send the user elsewhere. `from` is the path to return to after login.
    Redirect { to: String, from: Option<String> },
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    pub roles: Vec<Role>,
    pub require_approval: bool,
    pub email_verified: bool,
    pub redirect_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            roles: Vec::new(),
            require_approval: false,
            email_verified: false,
            redirect_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl RouteGuard {
    /// Any signed-in user
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn student() -> Self {
        Self {
            roles: vec![Role::Student],
            ..Self::default()
        }
    }

    /// Approved educators only
    pub fn educator() -> Self {
        Self {
            roles: vec![Role::Educator],
            require_approval: true,
            ..Self::default()
        }
    }

    pub fn admin() -> Self {
        Self {
            roles: vec![Role::Admin],
            ..Self::default()
        }
    }

    pub fn verified_email() -> Self {
        Self {
            email_verified: true,
            ..Self::default()
        }
    }

    pub fn educator_or_admin() -> Self {
        Self {
            roles: vec![Role::Educator, Role::Admin],
            ..Self::default()
        }
    }

    pub fn evaluate(&self, session: &SessionSnapshot, path: &str) -> GuardDecision {
        if !session.auth_checked || session.is_loading {
            return GuardDecision::Pending;
        }

        let user = match session.user {
            Some(ref user) => user,
            None => {
                return GuardDecision::Redirect {
                    to: self.redirect_path.clone(),
                    from: Some(path.to_string()),
                }
            }
        };

        if self.email_verified && !user.is_email_verified {
            return redirect(VERIFY_EMAIL_PATH, Some(path));
        }

        if !self.roles.is_empty() && !user.has_role(&self.roles) {
            return if user.role == Role::Student {
                redirect(STUDENT_FALLBACK_PATH, None)
            } else {
                redirect(UNAUTHORIZED_PATH, None)
            };
        }

        if self.require_approval && user.is_pending_educator() {
            return redirect(PENDING_APPROVAL_PATH, None);
        }

        GuardDecision::Allow
    }
}

fn redirect(to: &str, from: Option<&str>) -> GuardDecision {
    GuardDecision::Redirect {
        to: to.to_string(),
        from: from.map(str::to_string),
    }
}
