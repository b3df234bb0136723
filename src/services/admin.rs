// src/services/admin.rs
use crate::core::request::ApiClient;
use crate::types::ai::AnalyticsOverview;
use crate::types::{ApiResponse, User};

const ANALYTICS_OVERVIEW_ENDPOINT: &str = "/admin/analytics/overview";
const USERS_ENDPOINT: &str = "/admin/users";

/// Admin analytics and user listing, plus public employer pages.
#[derive(Clone)]
pub struct AdminService {
    client: ApiClient,
}

impl AdminService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn analytics_overview(&self) -> ApiResponse<AnalyticsOverview> {
        self.client.get(ANALYTICS_OVERVIEW_ENDPOINT).await
    }

    pub async fn list_users(&self) -> ApiResponse<Vec<User>> {
        self.client.get(USERS_ENDPOINT).await
    }

    pub async fn employer_profile(&self, employer_id: i64) -> ApiResponse<User> {
        self.client
            .get(&format!("/employers/{}", employer_id))
            .await
    }
}
