//! Platform endpoints used by learner and admin views.
//!
//! All of these are protected: they carry the session's bearer token and
//! go through the refresh cycle on 401.

use serde_json::{json, Value};

use crate::models::{Enrollment, Module, ProfileUpdate, Program, Topic, User};

use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    // ===== Profile =====

    pub async fn fetch_profile(&self) -> Result<User, ApiError> {
        let user: User = self.get("/profile/").await?;
        Ok(user.with_initials())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let user: User = self.send(ApiRequest::patch("/profile/").json(update)?).await?;
        Ok(user.with_initials())
    }

    // ===== Dashboard =====

    /// Dashboard summary; its shape varies by role
    pub async fn fetch_dashboard(&self) -> Result<Value, ApiError> {
        self.get("/user/dashboard/").await
    }

    pub async fn fetch_progress(&self) -> Result<Value, ApiError> {
        self.get("/user/progress/").await
    }

    // ===== Programs =====

    pub async fn fetch_programs(&self) -> Result<Vec<Program>, ApiError> {
        self.get("/programs/").await
    }

    pub async fn fetch_program(&self, program_id: i64) -> Result<Program, ApiError> {
        self.get(&format!("/programs/{}/", program_id)).await
    }

    pub async fn fetch_program_modules(&self, program_id: i64) -> Result<Vec<Module>, ApiError> {
        self.get(&format!("/programs/{}/modules/", program_id)).await
    }

    pub async fn enroll(&self, program_id: i64) -> Result<Enrollment, ApiError> {
        self.post(&format!("/programs/{}/enroll/", program_id), &json!({}))
            .await
    }

    // ===== Modules & topics =====

    pub async fn fetch_module(&self, program_id: i64, module_id: i64) -> Result<Module, ApiError> {
        self.get(&format!("/programs/{}/modules/{}/", program_id, module_id))
            .await
    }

    pub async fn fetch_module_topics(&self, module_id: i64) -> Result<Vec<Topic>, ApiError> {
        self.get(&format!("/modules/{}/topics/", module_id)).await
    }

    pub async fn fetch_topic(&self, topic_id: i64) -> Result<Topic, ApiError> {
        self.get(&format!("/topics/{}/", topic_id)).await
    }

    pub async fn mark_topic_completed(&self, topic_id: i64) -> Result<(), ApiError> {
        self.execute(ApiRequest::post(format!("/topics/{}/mark_completed", topic_id)))
            .await?;
        Ok(())
    }

    // ===== Admin =====

    /// Approve a pending educator account (admin only)
    pub async fn approve_educator(&self, user_id: i64) -> Result<(), ApiError> {
        self.execute(ApiRequest::patch(format!("/admin/users/{}/approve", user_id)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::test_support::{MockTransport, BASE_URL};

    #[tokio::test]
    async fn test_fetch_programs_parses_list() {
        let transport = MockTransport::new();
        transport.always(
            "GET",
            "/programs/",
            200,
            json!([
                {"id": 1, "title": "Algebra I", "difficulty": "Beginner"},
                {"id": 2, "title": "Geometry", "is_enrolled": true}
            ]),
        );
        let api = ApiClient::new(BASE_URL, transport.clone());
        api.set_token("tok".to_string());

        let programs = api.fetch_programs().await.unwrap();
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].difficulty_display(), "Beginner");
        assert!(programs[1].is_enrolled);
        assert_eq!(transport.calls()[0].authorization.as_deref(), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_fetch_profile_derives_initials() {
        let transport = MockTransport::new();
        transport.always(
            "GET",
            "/profile/",
            200,
            json!({"id": 5, "email": "zoe@x.com", "first_name": "zoe", "role": "ADMIN"}),
        );
        let api = ApiClient::new(BASE_URL, transport);

        let user = api.fetch_profile().await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.initials, "Z");
    }

    #[tokio::test]
    async fn test_mutating_service_paths_get_trailing_slash() {
        let transport = MockTransport::new();
        transport.always("POST", "/topics/9/mark_completed/", 200, json!({}));
        transport.always_raw("PATCH", "/admin/users/3/approve/", 204, "");
        let api = ApiClient::new(BASE_URL, transport.clone());

        api.mark_topic_completed(9).await.unwrap();
        api.approve_educator(3).await.unwrap();
        assert_eq!(transport.calls_to("/topics/9/mark_completed/"), 1);
        assert_eq!(transport.calls_to("/admin/users/3/approve/"), 1);
    }

    #[tokio::test]
    async fn test_update_profile_patches_changed_fields() {
        let transport = MockTransport::new();
        transport.always(
            "PATCH",
            "/profile/",
            200,
            json!({"id": 5, "email": "zoe@x.com", "first_name": "Zoe", "last_name": "Ng", "role": "EDUCATOR"}),
        );
        let api = ApiClient::new(BASE_URL, transport.clone());

        let update = ProfileUpdate {
            last_name: Some("Ng".to_string()),
            ..Default::default()
        };
        let user = api.update_profile(&update).await.unwrap();
        assert_eq!(user.display_name(), "Zoe Ng");
        assert_eq!(transport.calls()[0].body, Some(json!({"last_name": "Ng"})));
    }

    #[tokio::test]
    async fn test_program_and_module_lookups() {
        let transport = MockTransport::new();
        transport.always("GET", "/programs/7/", 200, json!({"id": 7, "title": "Calculus"}));
        transport.always(
            "GET",
            "/programs/7/modules/",
            200,
            json!([{"id": 70, "title": "Limits"}, {"id": 71, "title": "Derivatives"}]),
        );
        transport.always(
            "GET",
            "/programs/7/modules/71/",
            200,
            json!({"id": 71, "title": "Derivatives", "learning_objectives": ["Chain rule"]}),
        );
        transport.always(
            "GET",
            "/modules/71/topics/",
            200,
            json!([{"id": 710, "title": "Power rule", "is_completed": true}]),
        );
        let api = ApiClient::new(BASE_URL, transport);

        let program = api.fetch_program(7).await.unwrap();
        assert_eq!(program.title, "Calculus");

        let modules = api.fetch_program_modules(7).await.unwrap();
        assert_eq!(modules.len(), 2);

        let module = api.fetch_module(7, 71).await.unwrap();
        assert_eq!(module.learning_objectives, vec!["Chain rule".to_string()]);

        let topics = api.fetch_module_topics(71).await.unwrap();
        assert_eq!(topics[0].title, "Power rule");
        assert!(topics[0].is_completed);
    }

    #[tokio::test]
    async fn test_enroll_posts_to_program() {
        let transport = MockTransport::new();
        transport.always(
            "POST",
            "/programs/7/enroll/",
            201,
            json!({"program": 7, "status": "active", "enrolled_at": "2024-09-01T12:00:00Z"}),
        );
        let api = ApiClient::new(BASE_URL, transport.clone());
        api.set_token("tok".to_string());

        let enrollment = api.enroll(7).await.unwrap();
        assert_eq!(enrollment.program, 7);
        assert_eq!(enrollment.status.as_deref(), Some("active"));
        assert!(enrollment.enrolled_at.is_some());

        let calls = transport.calls();
        assert_eq!(calls[0].authorization.as_deref(), Some("Bearer tok"));
        assert_eq!(calls[0].body, Some(json!({})));
    }

    #[tokio::test]
    async fn test_not_found_maps_to_error() {
        let transport = MockTransport::new();
        transport.always("GET", "/topics/404/", 404, json!({"detail": "Topic not found"}));
        let api = ApiClient::new(BASE_URL, transport);

        let err = api.fetch_topic(404).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Topic not found"));
    }
}
