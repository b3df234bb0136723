// src/types/job.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or replacing a job posting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Browse filters; also the freshness key of a job listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JobFilter {
    pub search: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl JobFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(location) = &self.location {
            pairs.push(("location", location.clone()));
        }
        if let Some(job_type) = &self.job_type {
            pairs.push(("jobType", job_type.clone()));
        }
        if let Some(level) = &self.experience_level {
            pairs.push(("experienceLevel", level.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(size) = self.size {
            pairs.push(("size", size.to_string()));
        }
        pairs
    }

    /// Values are percent-encoded so distinct filters never share a key.
    pub fn signature(&self) -> String {
        let pairs = self.query_pairs();
        if pairs.is_empty() {
            return "jobs:all".to_string();
        }
        let parts: Vec<String> = pairs
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(&value)))
            .collect();
        format!("jobs:{}", parts.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_signature_is_stable() {
        let filter = JobFilter {
            search: Some("rust".to_string()),
            page: Some(2),
            ..Default::default()
        };

        assert_eq!(filter.signature(), "jobs:search=rust&page=2");
        assert_eq!(JobFilter::default().signature(), "jobs:all");
    }

    #[test]
    fn test_filter_signature_escapes_separators() {
        let injected = JobFilter {
            search: Some("a&page=2".to_string()),
            ..Default::default()
        };
        let paged = JobFilter {
            search: Some("a".to_string()),
            page: Some(2),
            ..Default::default()
        };

        assert_ne!(injected.signature(), paged.signature());
        assert_eq!(injected.signature(), "jobs:search=a%26page%3D2");
        assert_eq!(paged.signature(), "jobs:search=a&page=2");
    }

    #[test]
    fn test_job_tolerates_sparse_payloads() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": 3,
            "title": "Backend engineer",
            "description": "Build things",
            "salaryMin": 50000,
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(job.salary_min, Some(50000.0));
        assert!(job.skills.is_empty());
        assert!(job.created_at.is_some());
    }
}
