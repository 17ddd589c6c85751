use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub price_monthly: Option<f64>,
    #[serde(default)]
    pub price_yearly: Option<f64>,
    #[serde(default)]
    pub is_enrolled: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Program {
    pub fn difficulty_display(&self) -> &str {
        self.difficulty.as_deref().unwrap_or("All levels")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub program_title: Option<String>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    /// Total duration in minutes
    #[serde(default)]
    pub total_duration: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub module_id: Option<i64>,
    #[serde(default)]
    pub module_title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    /// Duration in minutes
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub program: i64,
    #[serde(default)]
    pub enrolled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Editable profile fields, as sent to `PATCH /profile/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program_with_missing_fields() {
        let json = r#"{"id": 7, "title": "Algebra I", "price_monthly": 9.5, "created_at": "2024-09-01T12:00:00Z"}"#;
        let p: Program = serde_json::from_str(json).expect("Failed to parse program JSON");
        assert_eq!(p.title, "Algebra I");
        assert_eq!(p.difficulty_display(), "All levels");
        assert!(!p.is_enrolled);
        assert!(p.created_at.is_some());
    }

    #[test]
    fn test_profile_update_omits_unset_fields() {
        let update = ProfileUpdate {
            bio: Some("Teaches calculus".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"bio":"Teaches calculus"}"#
        );
    }
}
