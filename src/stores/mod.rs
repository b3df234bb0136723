// src/stores/mod.rs
//! Observable client-side state containers. Each store owns a
//! `tokio::sync::watch` channel; subscribers see every committed snapshot.

pub mod applications;
pub mod freshness;
pub mod jobs;
pub mod profile;
pub mod session;

pub use applications::{ApplicationsState, ApplicationsStore};
pub use freshness::Freshness;
pub use jobs::{JobsState, JobsStore};
pub use profile::{ProfileState, ProfileStore};
pub use session::{Reconciliation, Session, SessionRuntime, SessionState, SessionStatus, SessionStore};

use tokio::sync::watch;
use tracing::warn;

use crate::core::errors::{to_user_message, ErrorInfo};
use crate::core::request::RequestOptions;
use crate::core::retry::RetryPolicy;
use crate::types::ApiResponse;

/// Loading/error flags every domain store carries.
pub(crate) trait StoreFlags {
    fn set_loading(&mut self, loading: bool);
    fn set_error(&mut self, error: Option<String>);
}

/// Normalized text for a failed envelope.
pub(crate) fn failure_message<T>(response: &ApiResponse<T>) -> String {
    let info = ErrorInfo {
        message: response
            .error
            .clone()
            .unwrap_or_else(|| ErrorInfo::unknown().message),
        code: None,
        status_code: response.status,
        details: None,
    };
    to_user_message(&info)
}

pub(crate) fn begin<S: StoreFlags>(state: &watch::Sender<S>) {
    state.send_modify(|state| {
        state.set_loading(true);
        state.set_error(None);
    });
}

/// Commits a successful payload through `apply`, or records the normalized
/// failure. Loading is cleared either way.
pub(crate) fn settle<S, T>(
    state: &watch::Sender<S>,
    action: &str,
    response: ApiResponse<T>,
    apply: impl FnOnce(&mut S, &T),
) -> ApiResponse<T>
where
    S: StoreFlags,
{
    if response.success {
        if let Some(data) = &response.data {
            state.send_modify(|state| {
                apply(state, data);
                state.set_loading(false);
            });
            return response;
        }
    }

    let message = failure_message(&response);
    warn!("{} failed: {}", action, message);
    state.send_modify(|state| {
        state.set_loading(false);
        state.set_error(Some(message.clone()));
    });

    let failed = ApiResponse::failure(message).with_message(response.message);
    match response.status {
        Some(status) => failed.with_status(status),
        None => failed,
    }
}

pub(crate) fn read_options(retry: Option<RetryPolicy>) -> RequestOptions {
    match retry {
        Some(policy) => RequestOptions::get().with_retry(policy),
        None => RequestOptions::get(),
    }
}

/// Swaps the element with the same id for `updated`; no-op when absent.
pub(crate) fn replace_by_id<T: Clone>(items: &mut [T], updated: &T, id_of: impl Fn(&T) -> i64) {
    let id = id_of(updated);
    if let Some(slot) = items.iter_mut().find(|item| id_of(item) == id) {
        *slot = updated.clone();
    }
}

pub(crate) fn remove_by_id<T>(items: &mut Vec<T>, id: i64, id_of: impl Fn(&T) -> i64) {
    items.retain(|item| id_of(item) != id);
}
