// src/services/ai.rs
//! Job-description generation, resume parsing and matching.

use serde_json::json;
use tracing::info;

use crate::core::request::ApiClient;
use crate::types::ai::{
    CandidateMatch, GeneratedJobDescription, JobDescriptionRequest, JobRecommendation, ParsedResume,
};
use crate::types::ApiResponse;

const GENERATE_DESCRIPTION_ENDPOINT: &str = "/intelligent-job-description/generate";
const IMPROVE_DESCRIPTION_ENDPOINT: &str = "/intelligent-job-description/improve";
const PARSE_RESUME_ENDPOINT: &str = "/resume-parsing/parse-text";

#[derive(Clone)]
pub struct AiService {
    client: ApiClient,
}

impl AiService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn generate_job_description(
        &self,
        request: &JobDescriptionRequest,
    ) -> ApiResponse<GeneratedJobDescription> {
        info!("Requesting job description for '{}'", request.title);
        self.client.post(GENERATE_DESCRIPTION_ENDPOINT, request).await
    }

    pub async fn improve_job_description(
        &self,
        description: &str,
    ) -> ApiResponse<GeneratedJobDescription> {
        self.client
            .post(
                IMPROVE_DESCRIPTION_ENDPOINT,
                &json!({ "description": description }),
            )
            .await
    }

    pub async fn parse_resume_text(&self, text: &str) -> ApiResponse<ParsedResume> {
        info!("Parsing resume text ({} chars)", text.chars().count());
        self.client
            .post(PARSE_RESUME_ENDPOINT, &json!({ "text": text }))
            .await
    }

    /// Best candidates for a job, highest score first as ranked by the backend.
    pub async fn match_candidates(&self, job_id: i64) -> ApiResponse<Vec<CandidateMatch>> {
        self.client
            .get(&format!("/advanced-matching/job/{}/candidates", job_id))
            .await
    }

    pub async fn recommend_jobs(&self, user_id: i64) -> ApiResponse<Vec<JobRecommendation>> {
        self.client
            .get(&format!("/advanced-matching/user/{}/jobs", user_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStorage;
    use crate::testutil::ScriptedTransport;
    use serde_json::Value;
    use std::sync::Arc;

    fn service() -> (Arc<ScriptedTransport>, AiService) {
        let transport = ScriptedTransport::new();
        let client = ApiClient::new(
            "http://api.test/api",
            transport.clone(),
            Arc::new(MemoryStorage::new()),
        );
        (transport, AiService::new(client))
    }

    #[tokio::test]
    async fn test_generate_keeps_unknown_fields() {
        let (transport, service) = service();
        transport.push_json(
            200,
            json!({
                "success": true,
                "data": {
                    "description": "We are hiring",
                    "requirements": ["Rust"],
                    "seoKeywords": ["backend"]
                }
            }),
        );

        let response = service
            .generate_job_description(&JobDescriptionRequest {
                title: "Backend engineer".to_string(),
                ..Default::default()
            })
            .await;

        let generated = response.data.unwrap();
        assert_eq!(generated.requirements, vec!["Rust"]);
        assert_eq!(generated.extra["seoKeywords"], json!(["backend"]));
        assert_eq!(
            transport.requests()[0].url,
            "http://api.test/api/intelligent-job-description/generate"
        );
    }

    #[tokio::test]
    async fn test_parse_resume_sends_text() {
        let (transport, service) = service();
        transport.push_json(200, json!({"fullName": "Jane Doe", "skills": [{"name": "Go"}]}));

        let parsed = service.parse_resume_text("Jane Doe\nGo developer").await;

        assert_eq!(parsed.data.unwrap().skills[0].name, "Go");
        let body: Value =
            serde_json::from_str(transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["text"], "Jane Doe\nGo developer");
    }

    #[tokio::test]
    async fn test_matching_failure_is_an_envelope() {
        let (transport, service) = service();
        transport.push_json(500, json!({"error": "model unavailable"}));

        let response = service.match_candidates(3).await;

        assert!(!response.success);
        assert_eq!(response.status, Some(500));
        assert_eq!(
            transport.requests()[0].url,
            "http://api.test/api/advanced-matching/job/3/candidates"
        );
    }
}
