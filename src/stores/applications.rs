// src/stores/applications.rs
//! A candidate's applications and the applications received for a job.

use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use crate::core::request::ApiClient;
use crate::core::retry::RetryPolicy;
use crate::types::{ApiResponse, ApplicationRequest, ApplicationStatus, JobApplication, StatusUpdate};

use super::freshness::Freshness;
use super::{begin, read_options, remove_by_id, replace_by_id, settle, StoreFlags};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationsState {
    pub user_applications: Vec<JobApplication>,
    pub user_id: Option<i64>,
    pub job_applications: Vec<JobApplication>,
    pub job_id: Option<i64>,
    pub current_application: Option<JobApplication>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl StoreFlags for ApplicationsState {
    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

impl ApplicationsState {
    fn replace(&mut self, application: &JobApplication) {
        replace_by_id(&mut self.user_applications, application, |a| a.id);
        replace_by_id(&mut self.job_applications, application, |a| a.id);
        if self.current_application.as_ref().map(|a| a.id) == Some(application.id) {
            self.current_application = Some(application.clone());
        }
    }

    fn remove(&mut self, id: i64) {
        remove_by_id(&mut self.user_applications, id, |a| a.id);
        remove_by_id(&mut self.job_applications, id, |a| a.id);
        if self.current_application.as_ref().map(|a| a.id) == Some(id) {
            self.current_application = None;
        }
    }
}

pub struct ApplicationsStore {
    client: ApiClient,
    state: watch::Sender<ApplicationsState>,
    freshness: Freshness,
    retry: Option<RetryPolicy>,
}

impl ApplicationsStore {
    pub fn new(client: ApiClient, ttl: Duration, retry: Option<RetryPolicy>) -> Self {
        let (state, _) = watch::channel(ApplicationsState::default());
        Self {
            client,
            state,
            freshness: Freshness::new(ttl),
            retry,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ApplicationsState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ApplicationsState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Whether the cached applications of the current user include `job_id`.
    pub fn has_applied(&self, job_id: i64) -> bool {
        self.state
            .borrow()
            .user_applications
            .iter()
            .any(|a| a.job_id == job_id && a.status != ApplicationStatus::Withdrawn)
    }

    pub fn reset(&self) {
        self.freshness.clear();
        self.state.send_replace(ApplicationsState::default());
    }

    // ===== Fetching =====

    pub async fn fetch_user_applications(
        &self,
        user_id: i64,
        force: bool,
    ) -> ApiResponse<Vec<JobApplication>> {
        let key = format!("user:{}", user_id);
        if !force && self.freshness.is_fresh(&key) && self.state.borrow().user_id == Some(user_id) {
            return ApiResponse::ok(self.state.borrow().user_applications.clone());
        }

        begin(&self.state);
        let response: ApiResponse<Vec<JobApplication>> = self
            .client
            .request(
                &format!("/applications/user/{}", user_id),
                read_options(self.retry),
            )
            .await;

        let response = settle(&self.state, "Fetching applications", response, |state, list| {
            state.user_applications = list.clone();
            state.user_id = Some(user_id);
        });
        if response.success {
            self.freshness.mark(&key);
        }
        response
    }

    pub async fn fetch_job_applications(
        &self,
        job_id: i64,
        force: bool,
    ) -> ApiResponse<Vec<JobApplication>> {
        let key = format!("job:{}", job_id);
        if !force && self.freshness.is_fresh(&key) && self.state.borrow().job_id == Some(job_id) {
            return ApiResponse::ok(self.state.borrow().job_applications.clone());
        }

        begin(&self.state);
        let response: ApiResponse<Vec<JobApplication>> = self
            .client
            .request(
                &format!("/applications/job/{}", job_id),
                read_options(self.retry),
            )
            .await;

        let response = settle(&self.state, "Fetching job applications", response, |state, list| {
            state.job_applications = list.clone();
            state.job_id = Some(job_id);
        });
        if response.success {
            self.freshness.mark(&key);
        }
        response
    }

    pub async fn fetch_application(&self, id: i64, force: bool) -> ApiResponse<JobApplication> {
        let key = format!("application:{}", id);
        if !force && self.freshness.is_fresh(&key) {
            if let Some(cached) = self
                .state
                .borrow()
                .current_application
                .clone()
                .filter(|a| a.id == id)
            {
                return ApiResponse::ok(cached);
            }
        }

        begin(&self.state);
        let response: ApiResponse<JobApplication> = self
            .client
            .request(&format!("/applications/{}", id), read_options(self.retry))
            .await;

        let response = settle(&self.state, "Fetching application", response, |state, a| {
            state.current_application = Some(a.clone());
        });
        if response.success {
            self.freshness.mark(&key);
        }
        response
    }

    // ===== Mutations =====

    pub async fn apply(&self, request: &ApplicationRequest) -> ApiResponse<JobApplication> {
        begin(&self.state);
        let response: ApiResponse<JobApplication> =
            self.client.post("/applications", request).await;

        settle(&self.state, "Applying", response, |state, application| {
            info!(
                "Application {} submitted for job {}",
                application.id, application.job_id
            );
            if state.user_id.is_none() || state.user_id == Some(application.user_id) {
                state.user_applications.insert(0, application.clone());
            }
            if state.job_id == Some(application.job_id) {
                state.job_applications.insert(0, application.clone());
            }
        })
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: ApplicationStatus,
    ) -> ApiResponse<JobApplication> {
        begin(&self.state);
        let response: ApiResponse<JobApplication> = self
            .client
            .put(&format!("/applications/{}/status", id), &StatusUpdate { status })
            .await;

        settle(&self.state, "Updating application status", response, |state, a| {
            state.replace(a)
        })
    }

    pub async fn withdraw(&self, id: i64) -> ApiResponse<()> {
        begin(&self.state);
        let response: ApiResponse<Value> =
            self.client.delete(&format!("/applications/{}", id)).await;
        let response = response.map(|_| ());

        let response = settle(&self.state, "Withdrawing application", response, |state, _| {
            state.remove(id)
        });
        if response.success {
            self.freshness.invalidate(&format!("application:{}", id));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStorage;
    use crate::testutil::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> (Arc<ScriptedTransport>, ApplicationsStore) {
        let transport = ScriptedTransport::new();
        let client = ApiClient::new(
            "http://api.test",
            transport.clone(),
            Arc::new(MemoryStorage::new()),
        );
        (
            transport,
            ApplicationsStore::new(client, Duration::from_secs(300), None),
        )
    }

    fn application(id: i64, job_id: i64, status: &str) -> Value {
        json!({"id": id, "jobId": job_id, "userId": 42, "status": status})
    }

    #[tokio::test]
    async fn test_user_applications_are_cached_per_user() {
        let (transport, store) = store();
        transport.push_json(200, json!([application(1, 10, "PENDING")]));
        transport.push_json(200, json!([]));

        store.fetch_user_applications(42, false).await;
        store.fetch_user_applications(42, false).await;
        store.fetch_user_applications(43, false).await;

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://api.test/applications/user/42",
                "http://api.test/applications/user/43"
            ]
        );
        assert!(store.state().user_applications.is_empty());
    }

    #[tokio::test]
    async fn test_apply_prepends_server_echo() {
        let (transport, store) = store();
        transport.push_json(200, json!([application(1, 10, "PENDING")]));
        store.fetch_user_applications(42, false).await;

        transport.push_json(201, application(2, 11, "PENDING"));
        let response = store
            .apply(&ApplicationRequest {
                job_id: 11,
                cover_letter: Some("Hello".to_string()),
                resume_url: None,
            })
            .await;

        assert!(response.success);
        assert!(store.has_applied(11));
        let ids: Vec<i64> = store.state().user_applications.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 1]);
        let body: Value =
            serde_json::from_str(transport.requests()[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"jobId": 11, "coverLetter": "Hello"}));
    }

    #[tokio::test]
    async fn test_status_update_replaces_in_job_list() {
        let (transport, store) = store();
        transport.push_json(
            200,
            json!([application(1, 10, "PENDING"), application(2, 10, "PENDING")]),
        );
        store.fetch_job_applications(10, false).await;

        let echo = application(2, 10, "SHORTLISTED");
        transport.push_json(200, echo.clone());
        store.update_status(2, ApplicationStatus::Shortlisted).await;

        let state = store.state();
        assert_eq!(state.job_applications[0].status, ApplicationStatus::Pending);
        assert_eq!(
            state.job_applications[1],
            serde_json::from_value::<JobApplication>(echo).unwrap()
        );
        let request = &transport.requests()[1];
        assert_eq!(request.url, "http://api.test/applications/2/status");
        assert_eq!(request.body.as_deref(), Some(r#"{"status":"SHORTLISTED"}"#));
    }

    #[tokio::test]
    async fn test_withdraw_failure_reports_error() {
        let (transport, store) = store();
        transport.push_json(200, json!([application(1, 10, "PENDING")]));
        store.fetch_user_applications(42, false).await;

        transport.push_network_error("connection reset");
        let response = store.withdraw(1).await;

        assert!(!response.success);
        assert!(store.error().is_some());
        assert_eq!(store.state().user_applications.len(), 1);

        transport.push_raw(200, Some("application/json"), "");
        assert!(store.withdraw(1).await.success);
        assert!(store.state().user_applications.is_empty());
        assert_eq!(store.error(), None);
    }
}
