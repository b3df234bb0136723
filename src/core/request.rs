// src/core/request.rs
//! Generic request layer: every backend call goes through `ApiClient::request`
//! and comes back as an `ApiResponse` envelope, never as an `Err`.

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::errors::{ApiError, FALLBACK_MESSAGE};
use super::retry::{with_retry, RetryPolicy};
use super::storage::{SessionPersistence, Storage};
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::types::ApiResponse;

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Overrides the persisted session token (server-side or pre-login calls).
    pub token: Option<String>,
    pub query: Vec<(String, String)>,
    /// Only honoured for GET.
    pub retry: Option<RetryPolicy>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}

/// A 2xx response, after envelope unwrapping.
#[derive(Debug)]
struct Payload {
    status: u16,
    success: bool,
    data: Value,
    error: Option<String>,
    message: Option<String>,
}

fn is_envelope(object: &Map<String, Value>) -> bool {
    object.get("success").map(Value::is_boolean).unwrap_or(false)
        && (object.contains_key("data") || object.contains_key("error") || object.contains_key("message"))
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
            storage,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiResponse<T> {
        let retry = options.retry.filter(|_| options.method == Method::GET);

        let outcome = match retry {
            Some(policy) => with_retry(policy, || self.execute(endpoint, &options)).await,
            None => self.execute(endpoint, &options).await,
        };

        match outcome {
            Ok(payload) => Self::into_envelope(endpoint, payload),
            Err(err) => {
                warn!("{} {} failed: {}", options.method, endpoint, err);
                let message = match &err {
                    ApiError::Http { message, .. } => message.clone(),
                    other => other.user_message(),
                };
                let response = ApiResponse::failure(message);
                match err.status() {
                    Some(status) => response.with_status(status),
                    None => response,
                }
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResponse<T> {
        self.request(endpoint, RequestOptions::get()).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiResponse<T> {
        self.send_json(Method::POST, endpoint, body).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiResponse<T> {
        self.send_json(Method::PUT, endpoint, body).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiResponse<T> {
        self.send_json(Method::PATCH, endpoint, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResponse<T> {
        self.request(endpoint, RequestOptions::new(Method::DELETE))
            .await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> ApiResponse<T> {
        match serde_json::to_value(body) {
            Ok(body) => {
                self.request(endpoint, RequestOptions::new(method).with_body(body))
                    .await
            }
            Err(e) => ApiResponse::failure(
                ApiError::InvalidRequest(format!("failed to encode body: {}", e)).user_message(),
            ),
        }
    }

    fn resolve_token(&self, options: &RequestOptions) -> Option<String> {
        options
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| SessionPersistence::new(self.storage.as_ref()).token())
    }

    fn build_url(&self, endpoint: &str, query: &[(String, String)]) -> Result<String, ApiError> {
        let joined = if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        };

        if query.is_empty() {
            return Ok(joined);
        }

        let mut url = Url::parse(&joined)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid URL {}: {}", joined, e)))?;
        url.query_pairs_mut().extend_pairs(query.iter());
        Ok(url.to_string())
    }

    async fn execute(&self, endpoint: &str, options: &RequestOptions) -> Result<Payload, ApiError> {
        let url = self.build_url(endpoint, &options.query)?;

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if options.body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if options.method != Method::GET {
            headers.push(("Cache-Control".to_string(), "no-cache".to_string()));
        }
        if let Some(token) = self.resolve_token(options) {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let request = HttpRequest {
            method: options.method.clone(),
            url,
            headers,
            body: options.body.as_ref().map(Value::to_string),
        };

        debug!("{} {}", request.method, request.url);
        let response = self.transport.send(request).await?;
        debug!("{} {} -> {}", options.method, endpoint, response.status);

        if !response.is_success() {
            return Err(Self::http_error(response));
        }

        Self::parse_success(response)
    }

    fn parse_success(response: HttpResponse) -> Result<Payload, ApiError> {
        let status = response.status;

        if !response.is_json() {
            return Ok(Payload {
                status,
                success: true,
                data: Value::String(response.body),
                error: None,
                message: None,
            });
        }

        if response.body.trim().is_empty() {
            return Ok(Payload {
                status,
                success: true,
                data: Value::Null,
                error: None,
                message: None,
            });
        }

        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Parse(format!("invalid JSON body: {}", e)))?;

        Ok(Self::unwrap_envelope(status, body))
    }

    /// `{success, data?, error?, message?}` bodies are unwrapped; anything
    /// else is the data itself.
    fn unwrap_envelope(status: u16, body: Value) -> Payload {
        match body {
            Value::Object(mut object) if is_envelope(&object) => {
                let text = |value: Option<Value>| match value {
                    Some(Value::String(text)) => Some(text),
                    Some(Value::Null) | None => None,
                    Some(other) => Some(other.to_string()),
                };
                Payload {
                    status,
                    success: object.get("success").and_then(Value::as_bool).unwrap_or(false),
                    data: object.remove("data").unwrap_or(Value::Null),
                    error: text(object.remove("error")),
                    message: text(object.remove("message")),
                }
            }
            data => Payload {
                status,
                success: true,
                data,
                error: None,
                message: None,
            },
        }
    }

    fn into_envelope<T: DeserializeOwned>(endpoint: &str, payload: Payload) -> ApiResponse<T> {
        if !payload.success {
            let error = payload
                .error
                .clone()
                .or_else(|| payload.message.clone())
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
            return ApiResponse::failure(error)
                .with_message(payload.message)
                .with_status(payload.status);
        }

        match serde_json::from_value::<T>(payload.data) {
            Ok(data) => ApiResponse::ok(data)
                .with_message(payload.message)
                .with_status(payload.status),
            Err(e) => {
                warn!("Unexpected response shape from {}: {}", endpoint, e);
                ApiResponse::failure(ApiError::Parse(e.to_string()).user_message())
                    .with_status(payload.status)
            }
        }
    }

    /// Message preference: JSON `message`, JSON `error`, raw text,
    /// `HTTP <status>: <statusText>`.
    fn http_error(response: HttpResponse) -> ApiError {
        let parsed: Option<Value> = serde_json::from_str(&response.body).ok();

        let structured = parsed.as_ref().and_then(|body| {
            ["message", "error"].iter().find_map(|key| {
                body.get(*key)
                    .and_then(Value::as_str)
                    .filter(|text| !text.trim().is_empty())
                    .map(str::to_string)
            })
        });

        let message = structured
            .or_else(|| {
                let text = response.body.trim();
                (!text.is_empty()).then(|| text.to_string())
            })
            .unwrap_or_else(|| format!("HTTP {}: {}", response.status, response.status_text));

        ApiError::Http {
            status: response.status,
            status_text: response.status_text,
            message,
            details: parsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::{MemoryStorage, PersistedSession};
    use crate::testutil::{sample_user, ScriptedTransport};
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: i64,
    }

    fn client(transport: &Arc<ScriptedTransport>) -> (ApiClient, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let client = ApiClient::new("http://api.test/api/", transport.clone(), storage.clone());
        (client, storage)
    }

    #[tokio::test]
    async fn test_json_success() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, serde_json::json!({"id": 4}));
        let (client, _) = client(&transport);

        let response: ApiResponse<Thing> = client.get("/things/4").await;

        assert!(response.success);
        assert_eq!(response.data, Some(Thing { id: 4 }));
        assert_eq!(transport.requests()[0].url, "http://api.test/api/things/4");
    }

    #[tokio::test]
    async fn test_plain_text_body_becomes_data() {
        let transport = ScriptedTransport::new();
        transport.push_text(200, "eyJ.token.sig");
        let (client, _) = client(&transport);

        let response: ApiResponse<String> = client
            .post("/users/login", &serde_json::json!({"username": "a"}))
            .await;

        assert_eq!(response.data.as_deref(), Some("eyJ.token.sig"));
    }

    #[tokio::test]
    async fn test_backend_envelope_is_unwrapped() {
        let transport = ScriptedTransport::new();
        transport.push_json(
            200,
            serde_json::json!({"success": true, "data": {"id": 9}, "message": "fetched"}),
        );
        transport.push_json(
            200,
            serde_json::json!({"success": false, "error": "quota exceeded"}),
        );
        let (client, _) = client(&transport);

        let ok: ApiResponse<Thing> = client.get("/things/9").await;
        assert_eq!(ok.data, Some(Thing { id: 9 }));
        assert_eq!(ok.message.as_deref(), Some("fetched"));

        let failed: ApiResponse<Thing> = client.get("/things/9").await;
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn test_bare_failed_envelope_uses_fallback_message() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, serde_json::json!({"success": false}));
        let (client, _) = client(&transport);

        let failed: ApiResponse<Thing> = client.get("/things/9").await;
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some(FALLBACK_MESSAGE));
        assert_eq!(failed.status, Some(200));
    }

    #[tokio::test]
    async fn test_http_error_message_sources() {
        let transport = ScriptedTransport::new();
        transport.push_json(400, serde_json::json!({"message": "Title is required"}));
        transport.push_json(409, serde_json::json!({"error": "Already applied"}));
        transport.push_text(502, "bad gateway from proxy");
        transport.push_text(503, "");
        // success:true in the body must not win over the status
        transport.push_json(500, serde_json::json!({"success": true, "data": {"id": 1}}));
        let (client, _) = client(&transport);

        let mut errors = Vec::new();
        for _ in 0..5 {
            let response: ApiResponse<Thing> = client.get("/things").await;
            assert!(!response.success);
            errors.push((response.status, response.error.unwrap()));
        }

        assert_eq!(errors[0], (Some(400), "Title is required".to_string()));
        assert_eq!(errors[1], (Some(409), "Already applied".to_string()));
        assert_eq!(errors[2], (Some(502), "bad gateway from proxy".to_string()));
        assert_eq!(
            errors[3],
            (Some(503), "HTTP 503: Service Unavailable".to_string())
        );
        assert_eq!(errors[4].0, Some(500));
    }

    #[tokio::test]
    async fn test_network_failure_is_normalized() {
        let transport = ScriptedTransport::new();
        transport.push_network_error("connection refused");
        let (client, _) = client(&transport);

        let response: ApiResponse<Thing> = client.get("/things").await;

        assert!(!response.success);
        assert!(response.error.unwrap().contains("internet connection"));
    }

    #[tokio::test]
    async fn test_unparseable_success_body() {
        let transport = ScriptedTransport::new();
        transport.push_raw(200, Some("application/json"), "{broken");
        transport.push_json(200, serde_json::json!({"unexpected": true}));
        let (client, _) = client(&transport);

        let broken: ApiResponse<Thing> = client.get("/things/1").await;
        assert!(!broken.success);
        assert!(broken.error.unwrap().contains("parse"));

        let wrong_shape: ApiResponse<Thing> = client.get("/things/1").await;
        assert!(!wrong_shape.success);
    }

    #[tokio::test]
    async fn test_auth_header_resolution() {
        let transport = ScriptedTransport::new();
        for _ in 0..3 {
            transport.push_json(200, serde_json::json!(null));
        }
        let (client, storage) = client(&transport);

        let _: ApiResponse<()> = client.get("/anonymous").await;

        SessionPersistence::new(storage.as_ref())
            .save(&PersistedSession {
                user: Some(sample_user()),
                token: Some("stored.token.value".to_string()),
            })
            .unwrap();
        let _: ApiResponse<()> = client.get("/stored").await;
        let _: ApiResponse<()> = client
            .request("/explicit", RequestOptions::get().with_token("explicit.token.value"))
            .await;

        let requests = transport.requests();
        assert_eq!(requests[0].header("Authorization"), None);
        assert_eq!(
            requests[1].header("Authorization"),
            Some("Bearer stored.token.value")
        );
        assert_eq!(
            requests[2].header("Authorization"),
            Some("Bearer explicit.token.value")
        );
    }

    #[tokio::test]
    async fn test_mutations_bypass_cache() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, serde_json::json!({"id": 1}));
        transport.push_json(200, serde_json::json!({"id": 1}));
        let (client, _) = client(&transport);

        let _: ApiResponse<Thing> = client.get("/things/1").await;
        let _: ApiResponse<Thing> = client.put("/things/1", &serde_json::json!({"id": 1})).await;

        let requests = transport.requests();
        assert_eq!(requests[0].header("Cache-Control"), None);
        assert_eq!(requests[1].header("Cache-Control"), Some("no-cache"));
        assert_eq!(requests[1].header("Content-Type"), Some("application/json"));
        assert_eq!(requests[1].body.as_deref(), Some(r#"{"id":1}"#));
    }

    #[tokio::test]
    async fn test_query_is_encoded() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, serde_json::json!([]));
        let (client, _) = client(&transport);

        let _: ApiResponse<Vec<Thing>> = client
            .request(
                "/jobs",
                RequestOptions::get().with_query([("search", "rust dev"), ("page", "2")]),
            )
            .await;

        assert_eq!(
            transport.requests()[0].url,
            "http://api.test/api/jobs?search=rust+dev&page=2"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_is_opt_in_and_get_only() {
        let transport = ScriptedTransport::new();
        transport.push_text(500, "down");
        transport.push_json(200, serde_json::json!({"id": 2}));
        transport.push_text(500, "down");
        let (client, _) = client(&transport);
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let fetched: ApiResponse<Thing> = client
            .request("/things/2", RequestOptions::get().with_retry(policy))
            .await;
        assert_eq!(fetched.data, Some(Thing { id: 2 }));
        assert_eq!(transport.requests().len(), 2);

        let posted: ApiResponse<Thing> = client
            .request(
                "/things",
                RequestOptions::new(Method::POST)
                    .with_body(serde_json::json!({}))
                    .with_retry(policy),
            )
            .await;
        assert!(!posted.success);
        assert_eq!(transport.requests().len(), 3);
    }
}
