// src/lib.rs
//! Client-side data and session layer for the job-board backend: session
//! persistence, role gating, cached domain stores and the request layer
//! they share.

pub mod auth;
pub mod config;
pub mod core;
pub mod services;
pub mod stores;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod testutil;

use anyhow::{Context, Result};
use std::sync::{Arc, Weak};
use tracing::info;

use crate::auth::AuthManager;
use crate::config::ClientConfig;
use crate::core::{ApiClient, FileStorage, ReqwestTransport, Storage, Transport};
use crate::services::{AdminService, AiService};
use crate::stores::{ApplicationsStore, JobsStore, ProfileStore, Session, SessionStore};

pub use crate::config::{LogSettings, RetrySettings};
pub use crate::types::ApiResponse;

const SESSION_NAMESPACE: &str = "session";

/// Everything a UI shell needs, wired once at startup.
pub struct JobBoardClient {
    config: ClientConfig,
    auth: Arc<AuthManager>,
    api: ApiClient,
    session: Arc<SessionStore>,
    jobs: Arc<JobsStore>,
    applications: Arc<ApplicationsStore>,
    profiles: Arc<ProfileStore>,
    ai: AiService,
    admin: AdminService,
}

impl JobBoardClient {
    /// HTTP transport plus a JSON file under `storage_dir` for the session.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())
            .context("Failed to create HTTP transport")?;
        let storage = FileStorage::in_dir(&config.storage_dir, SESSION_NAMESPACE)
            .context("Failed to open session storage")?;
        Ok(Self::with_parts(config, Arc::new(transport), Arc::new(storage)))
    }

    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let auth = Arc::new(AuthManager::new(storage.clone()));
        let api = ApiClient::new(config.api_base_url.clone(), transport, storage);
        let ttl = config.freshness_ttl();
        let read_retry = config.read_retry();

        let session = SessionStore::new(api.clone(), auth.clone());
        let jobs = Arc::new(JobsStore::new(api.clone(), ttl, read_retry));
        let applications = Arc::new(ApplicationsStore::new(api.clone(), ttl, read_retry));
        let profiles = Arc::new(ProfileStore::new(api.clone(), ttl, read_retry));

        // Cached records belong to whoever was logged in.
        let weak_auth: Weak<AuthManager> = Arc::downgrade(&auth);
        let (jobs_ref, applications_ref, profiles_ref) =
            (jobs.clone(), applications.clone(), profiles.clone());
        auth.add_listener(move || {
            let signed_out = weak_auth
                .upgrade()
                .map(|auth| !auth.is_authenticated())
                .unwrap_or(true);
            if signed_out {
                jobs_ref.reset();
                applications_ref.reset();
                profiles_ref.reset();
            }
        });

        Self {
            ai: AiService::new(api.clone()),
            admin: AdminService::new(api.clone()),
            config,
            auth,
            api,
            session,
            jobs,
            applications,
            profiles,
        }
    }

    /// Reconciles and rehydrates the persisted session. Call before any
    /// auth-dependent request.
    pub fn start(&self) -> Session {
        info!("Starting job-board client against {}", self.config.api_base_url);
        self.auth.init();
        self.session.hydrate()
    }

    /// Drops every auth listener, including the stores' own.
    pub fn shutdown(&self) {
        self.auth.dispose();
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn jobs(&self) -> &Arc<JobsStore> {
        &self.jobs
    }

    pub fn applications(&self) -> &Arc<ApplicationsStore> {
        &self.applications
    }

    pub fn profiles(&self) -> &Arc<ProfileStore> {
        &self.profiles
    }

    pub fn ai(&self) -> &AiService {
        &self.ai
    }

    pub fn admin(&self) -> &AdminService {
        &self.admin
    }
}
