// src/stores/freshness.rs
//! Last-fetch bookkeeping per scope key. Checked synchronously before a
//! fetch starts; two callers in the same tick may both miss it.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug)]
pub struct Freshness {
    ttl: Duration,
    fetched: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Freshness {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::minutes(5)),
            fetched: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_fresh(&self, key: &str) -> bool {
        self.is_fresh_at(key, Utc::now())
    }

    pub fn is_fresh_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.lock()
            .get(key)
            .map(|fetched_at| now - *fetched_at < self.ttl)
            .unwrap_or(false)
    }

    pub fn mark(&self, key: &str) {
        self.mark_at(key, Utc::now());
    }

    pub fn mark_at(&self, key: &str, at: DateTime<Utc>) {
        self.lock().insert(key.to_string(), at);
    }

    pub fn last_fetched(&self, key: &str) -> Option<DateTime<Utc>> {
        self.lock().get(key).copied()
    }

    pub fn invalidate(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drops every key starting with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.lock().retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.fetched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
