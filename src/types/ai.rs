// src/types/ai.rs
//! Shapes returned by the server-side AI, analytics and employer endpoints.
//! Unknown fields are kept in `extra` so the UI can still render them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Education, Experience, Job, Profile, Skill};

// ===== Job description generation =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptionRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedJobDescription {
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub suggested_skills: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ===== Resume parsing =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResume {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ===== Matching =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMatch {
    pub user_id: i64,
    pub score: f64,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecommendation {
    pub job: Job,
    pub score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

// ===== Admin analytics =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_jobs: u64,
    #[serde(default)]
    pub total_applications: u64,
    #[serde(default)]
    pub active_employers: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
