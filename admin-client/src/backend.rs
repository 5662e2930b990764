use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use common_auth::Credential;
use common_http_errors::{ApiError, ApiResult};
use common_observability::SessionMetrics;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// Raw login body. Both halves are optional on the wire; the authenticator
/// decides what a usable answer is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
}

/// The two backend calls the session core depends on.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse>;

    /// "Who am I" for the given credential; the body is returned undecoded.
    async fn current_user(&self, credential: &Credential) -> ApiResult<Value>;
}

/// JSON-over-HTTP client for the gym backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    metrics: Option<Arc<SessionMetrics>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str, credential: Option<&Credential>) -> ApiResult<Value> {
        self.send(Method::GET, path, credential, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        credential: Option<&Credential>,
        body: &Value,
    ) -> ApiResult<Value> {
        self.send(Method::POST, path, credential, Some(body)).await
    }

    pub async fn put(
        &self,
        path: &str,
        credential: Option<&Credential>,
        body: &Value,
    ) -> ApiResult<Value> {
        self.send(Method::PUT, path, credential, Some(body)).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        credential: Option<&Credential>,
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);

        if let Some(credential) = credential {
            // A token that cannot even form a header is as good as revoked.
            let header = credential
                .authorization_value()
                .map_err(|err| ApiError::Rejected {
                    status: StatusCode::UNAUTHORIZED,
                    message: err.to_string(),
                })?;
            request = request.header(AUTHORIZATION, header);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let result = self.execute(request).await;
        let elapsed = started.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.observe_backend(&endpoint_label(path), elapsed.as_secs_f64());
        }
        debug!(
            %method,
            path,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = result.is_ok(),
            "backend call finished"
        );
        result
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> ApiResult<Value> {
        let response = request.send().await.map_err(ApiError::transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::transport)?;

        if !status.is_success() {
            return Err(ApiError::from_response(status, &bytes));
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(ApiError::malformed)
    }
}

#[async_trait]
impl IdentityProvider for ApiClient {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let body = json!({ "email": email, "password": password });
        let value = self.post("/auth/login", None, &body).await?;
        serde_json::from_value(value).map_err(ApiError::malformed)
    }

    async fn current_user(&self, credential: &Credential) -> ApiResult<Value> {
        self.get("/auth/me", Some(credential)).await
    }
}

/// Metric label for a request path: ids never become label values.
fn endpoint_label(path: &str) -> String {
    let path = path.split('?').next().unwrap_or_default();
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    match segments.next() {
        Some(first @ ("auth" | "setup")) => match segments.next() {
            Some(second) => format!("{first}_{second}"),
            None => first.to_string(),
        },
        Some(first) => first.to_string(),
        None => "root".to_string(),
    }
}
