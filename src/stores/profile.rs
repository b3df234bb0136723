// src/stores/profile.rs
//! Profiles and their editable sections (skills, educations, experiences,
//! portfolios). Profiles are keyed by the owning user's id.

use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use crate::core::request::ApiClient;
use crate::core::retry::RetryPolicy;
use crate::types::{ApiResponse, Profile, ProfileSection};

use super::freshness::Freshness;
use super::{begin, read_options, remove_by_id, replace_by_id, settle, StoreFlags};

const PROFILES_KEY: &str = "profiles:all";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileState {
    pub profiles: Vec<Profile>,
    pub current_profile: Option<Profile>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl StoreFlags for ProfileState {
    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

impl ProfileState {
    fn put(&mut self, profile: &Profile) {
        replace_by_id(&mut self.profiles, profile, |p| p.user_id);
        if self.current_profile.as_ref().map(|p| p.user_id) == Some(profile.user_id) {
            self.current_profile = Some(profile.clone());
        }
    }

    /// Applies `edit` to every cached copy of `user_id`'s profile.
    fn edit(&mut self, user_id: i64, edit: impl Fn(&mut Profile)) {
        if let Some(current) = self
            .current_profile
            .as_mut()
            .filter(|p| p.user_id == user_id)
        {
            edit(current);
        }
        if let Some(listed) = self.profiles.iter_mut().find(|p| p.user_id == user_id) {
            edit(listed);
        }
    }
}

fn profile_key(user_id: i64) -> String {
    format!("profile:{}", user_id)
}

fn section_path<S: ProfileSection>(user_id: i64, item_id: Option<i64>) -> String {
    match item_id {
        Some(item_id) => format!("/profiles/{}/{}/{}", user_id, S::PATH, item_id),
        None => format!("/profiles/{}/{}", user_id, S::PATH),
    }
}

pub struct ProfileStore {
    client: ApiClient,
    state: watch::Sender<ProfileState>,
    freshness: Freshness,
    retry: Option<RetryPolicy>,
}

impl ProfileStore {
    pub fn new(client: ApiClient, ttl: Duration, retry: Option<RetryPolicy>) -> Self {
        let (state, _) = watch::channel(ProfileState::default());
        Self {
            client,
            state,
            freshness: Freshness::new(ttl),
            retry,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ProfileState {
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

    pub fn is_fresh(&self, user_id: i64) -> bool {
        self.freshness.is_fresh(&profile_key(user_id))
    }

    pub fn reset(&self) {
        self.freshness.clear();
        self.state.send_replace(ProfileState::default());
    }

    // ===== Profiles =====

    pub async fn fetch_profiles(&self, force: bool) -> ApiResponse<Vec<Profile>> {
        if !force && self.freshness.is_fresh(PROFILES_KEY) {
            return ApiResponse::ok(self.state.borrow().profiles.clone());
        }

        begin(&self.state);
        let response: ApiResponse<Vec<Profile>> = self
            .client
            .request("/profiles", read_options(self.retry))
            .await;

        let response = settle(&self.state, "Fetching profiles", response, |state, list| {
            state.profiles = list.clone();
        });
        if response.success {
            self.freshness.mark(PROFILES_KEY);
        }
        response
    }

    pub async fn fetch_profile(&self, user_id: i64, force: bool) -> ApiResponse<Profile> {
        let key = profile_key(user_id);
        if !force && self.freshness.is_fresh(&key) {
            if let Some(cached) = self
                .state
                .borrow()
                .current_profile
                .clone()
                .filter(|p| p.user_id == user_id)
            {
                return ApiResponse::ok(cached);
            }
        }

        begin(&self.state);
        let response: ApiResponse<Profile> = self
            .client
            .request(&format!("/profiles/{}", user_id), read_options(self.retry))
            .await;

        let response = settle(&self.state, "Fetching profile", response, |state, profile| {
            state.current_profile = Some(profile.clone());
        });
        if response.success {
            self.freshness.mark(&key);
        }
        response
    }

    pub async fn create_profile(&self, profile: &Profile) -> ApiResponse<Profile> {
        begin(&self.state);
        let response: ApiResponse<Profile> = self
            .client
            .post(&format!("/profiles/{}", profile.user_id), profile)
            .await;

        let response = settle(&self.state, "Creating profile", response, |state, created| {
            info!("Created profile for user {}", created.user_id);
            state.profiles.insert(0, created.clone());
            state.current_profile = Some(created.clone());
        });
        if response.success {
            self.freshness.mark(&profile_key(profile.user_id));
        }
        response
    }

    pub async fn update_profile(&self, profile: &Profile) -> ApiResponse<Profile> {
        begin(&self.state);
        let response: ApiResponse<Profile> = self
            .client
            .put(&format!("/profiles/{}", profile.user_id), profile)
            .await;

        settle(&self.state, "Updating profile", response, |state, updated| {
            state.put(updated)
        })
    }

    pub async fn delete_profile(&self, user_id: i64) -> ApiResponse<()> {
        begin(&self.state);
        let response: ApiResponse<Value> =
            self.client.delete(&format!("/profiles/{}", user_id)).await;
        let response = response.map(|_| ());

        let response = settle(&self.state, "Deleting profile", response, |state, _| {
            remove_by_id(&mut state.profiles, user_id, |p| p.user_id);
            if state.current_profile.as_ref().map(|p| p.user_id) == Some(user_id) {
                state.current_profile = None;
            }
        });
        if response.success {
            self.freshness.invalidate(&profile_key(user_id));
        }
        response
    }

    // ===== Sections =====

    pub async fn add_section_item<S: ProfileSection>(&self, user_id: i64, item: &S) -> ApiResponse<S> {
        begin(&self.state);
        let response: ApiResponse<S> = self
            .client
            .post(&section_path::<S>(user_id, None), item)
            .await;

        settle(&self.state, "Adding profile item", response, |state, created| {
            state.edit(user_id, |profile| S::items_mut(profile).insert(0, created.clone()));
        })
    }

    pub async fn update_section_item<S: ProfileSection>(
        &self,
        user_id: i64,
        item_id: i64,
        item: &S,
    ) -> ApiResponse<S> {
        begin(&self.state);
        let response: ApiResponse<S> = self
            .client
            .put(&section_path::<S>(user_id, Some(item_id)), item)
            .await;

        settle(&self.state, "Updating profile item", response, |state, updated| {
            state.edit(user_id, |profile| {
                if let Some(slot) = S::items_mut(profile)
                    .iter_mut()
                    .find(|existing| existing.item_id() == Some(item_id))
                {
                    *slot = updated.clone();
                }
            });
        })
    }

    pub async fn remove_section_item<S: ProfileSection>(
        &self,
        user_id: i64,
        item_id: i64,
    ) -> ApiResponse<()> {
        begin(&self.state);
        let response: ApiResponse<Value> = self
            .client
            .delete(&section_path::<S>(user_id, Some(item_id)))
            .await;
        let response = response.map(|_| ());

        settle(&self.state, "Removing profile item", response, |state, _| {
            state.edit(user_id, |profile| {
                S::items_mut(profile).retain(|existing| existing.item_id() != Some(item_id))
            });
        })
    }
}
