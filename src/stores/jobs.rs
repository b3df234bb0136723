// src/stores/jobs.rs
//! Cached job listings, the job being viewed and an employer's own postings.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use crate::core::request::ApiClient;
use crate::core::retry::RetryPolicy;
use crate::types::{ApiResponse, Job, JobFilter, JobInput};

use super::freshness::Freshness;
use super::{begin, read_options, remove_by_id, replace_by_id, settle, StoreFlags};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobsState {
    pub jobs: Vec<Job>,
    /// Filter the `jobs` listing was fetched with.
    pub filter: JobFilter,
    pub current_job: Option<Job>,
    pub employer_jobs: Vec<Job>,
    pub employer_id: Option<i64>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl StoreFlags for JobsState {
    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

/// Listing endpoints answer with a bare array or a Spring-style page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    List(Vec<Job>),
    Page { content: Vec<Job> },
}

impl Listing {
    fn into_jobs(self) -> Vec<Job> {
        match self {
            Listing::Page { content } => content,
            Listing::List(jobs) => jobs,
        }
    }
}

fn job_key(id: i64) -> String {
    format!("job:{}", id)
}

fn employer_key(id: i64) -> String {
    format!("employer:{}", id)
}

pub struct JobsStore {
    client: ApiClient,
    state: watch::Sender<JobsState>,
    freshness: Freshness,
    retry: Option<RetryPolicy>,
}

impl JobsStore {
    pub fn new(client: ApiClient, ttl: Duration, retry: Option<RetryPolicy>) -> Self {
        let (state, _) = watch::channel(JobsState::default());
        Self {
            client,
            state,
            freshness: Freshness::new(ttl),
            retry,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<JobsState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> JobsState {
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

    pub fn is_fresh(&self, filter: &JobFilter) -> bool {
        self.freshness.is_fresh(&filter.signature()) && self.state.borrow().filter == *filter
    }

    /// Drops cached data and timestamps, e.g. after logout.
    pub fn reset(&self) {
        self.freshness.clear();
        self.state.send_replace(JobsState::default());
    }

    // ===== Fetching =====

    pub async fn fetch_jobs(&self, filter: JobFilter, force: bool) -> ApiResponse<Vec<Job>> {
        let key = filter.signature();
        if !force && self.is_fresh(&filter) {
            return ApiResponse::ok(self.state.borrow().jobs.clone());
        }

        begin(&self.state);
        let options = read_options(self.retry).with_query(filter.query_pairs());
        let response: ApiResponse<Listing> = self.client.request("/jobs", options).await;
        let response = response.map(Listing::into_jobs);

        let response = settle(&self.state, "Fetching jobs", response, |state, jobs| {
            state.jobs = jobs.clone();
            state.filter = filter.clone();
        });
        if response.success {
            self.freshness.mark(&key);
        }
        response
    }

    pub async fn fetch_job(&self, id: i64, force: bool) -> ApiResponse<Job> {
        let key = job_key(id);
        if !force && self.freshness.is_fresh(&key) {
            if let Some(job) = self.state.borrow().current_job.clone().filter(|job| job.id == id) {
                return ApiResponse::ok(job);
            }
        }

        begin(&self.state);
        let response: ApiResponse<Job> = self
            .client
            .request(&format!("/jobs/{}", id), read_options(self.retry))
            .await;

        let response = settle(&self.state, "Fetching job", response, |state, job| {
            state.current_job = Some(job.clone());
        });
        if response.success {
            self.freshness.mark(&key);
        }
        response
    }

    pub async fn fetch_employer_jobs(&self, employer_id: i64, force: bool) -> ApiResponse<Vec<Job>> {
        let key = employer_key(employer_id);
        if !force
            && self.freshness.is_fresh(&key)
            && self.state.borrow().employer_id == Some(employer_id)
        {
            return ApiResponse::ok(self.state.borrow().employer_jobs.clone());
        }

        begin(&self.state);
        let response: ApiResponse<Listing> = self
            .client
            .request(
                &format!("/employers/{}/jobs", employer_id),
                read_options(self.retry),
            )
            .await;
        let response = response.map(Listing::into_jobs);

        let response = settle(&self.state, "Fetching employer jobs", response, |state, jobs| {
            state.employer_jobs = jobs.clone();
            state.employer_id = Some(employer_id);
        });
        if response.success {
            self.freshness.mark(&key);
        }
        response
    }

    // ===== Mutations =====

    pub async fn create_job(&self, input: &JobInput) -> ApiResponse<Job> {
        begin(&self.state);
        let response: ApiResponse<Job> = self.client.post("/jobs", input).await;

        settle(&self.state, "Creating job", response, |state, job| {
            info!("Created job {} ({})", job.id, job.title);
            state.jobs.insert(0, job.clone());
            if job.employer_id.is_some() && job.employer_id == state.employer_id {
                state.employer_jobs.insert(0, job.clone());
            }
        })
    }

    pub async fn update_job(&self, id: i64, input: &JobInput) -> ApiResponse<Job> {
        begin(&self.state);
        let response: ApiResponse<Job> = self.client.put(&format!("/jobs/{}", id), input).await;

        settle(&self.state, "Updating job", response, |state, job| {
            replace_by_id(&mut state.jobs, job, |j| j.id);
            replace_by_id(&mut state.employer_jobs, job, |j| j.id);
            if state.current_job.as_ref().map(|current| current.id) == Some(job.id) {
                state.current_job = Some(job.clone());
            }
        })
    }

    pub async fn delete_job(&self, id: i64) -> ApiResponse<()> {
        begin(&self.state);
        let response: ApiResponse<Value> = self.client.delete(&format!("/jobs/{}", id)).await;
        let response = response.map(|_| ());

        let response = settle(&self.state, "Deleting job", response, |state, _| {
            remove_by_id(&mut state.jobs, id, |j| j.id);
            remove_by_id(&mut state.employer_jobs, id, |j| j.id);
            if state.current_job.as_ref().map(|current| current.id) == Some(id) {
                state.current_job = None;
            }
        });
        if response.success {
            self.freshness.invalidate(&job_key(id));
        }
        response
    }
}
