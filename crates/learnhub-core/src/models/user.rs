use serde::{Deserialize, Serialize};

/// Platform role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Educator,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "Student"),
            Role::Educator => write!(f, "Educator"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

/// Identity record returned by the auth endpoints and persisted with the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub role: Role,
    /// Educators need admin approval before publishing content
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub initials: String,
}

impl User {
    /// Upper-cased first letter of the first name, falling back to the email
    pub fn derive_initials(first_name: Option<&str>, email: &str) -> String {
        first_name
            .and_then(|n| n.trim().chars().next())
            .or_else(|| email.trim().chars().next())
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }

    /// Return the user with `initials` recomputed from its name/email
    pub fn with_initials(mut self) -> Self {
        self.initials = Self::derive_initials(self.first_name.as_deref(), &self.email);
        self
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{} {}", first, last)
            }
            (Some(first), _) if !first.is_empty() => first.clone(),
            _ => self.email.clone(),
        }
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Educators awaiting admin approval
    pub fn is_pending_educator(&self) -> bool {
        self.role == Role::Educator && !self.is_approved
    }
}
