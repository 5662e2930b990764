#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use admin_client::{AdminApp, ClientConfig, IdentityProvider, LoginResponse, MemoryStorage};
use anyhow::Result;
use async_trait::async_trait;
use common_auth::{Credential, Principal, Role, TenantScope};
use common_http_errors::{ApiError, ApiResult};
use serde_json::{json, Value};
use tokio::sync::Notify;

pub const TENANT: &str = "gym-1";

pub fn user_json(id: &str, role: &str) -> Value {
    json!({
        "_id": id,
        "name": format!("{role} user"),
        "email": format!("{id}@gym.test"),
        "role": role,
        "tenantId": TENANT,
    })
}

pub fn principal(id: &str, role: Role) -> Principal {
    let tenant = if role.is_tenant_scoped() {
        TenantScope::Tenant(TENANT.to_string())
    } else {
        TenantScope::Global
    };
    Principal {
        id: id.to_string(),
        name: format!("{role} user"),
        email: format!("{id}@gym.test"),
        role,
        tenant,
    }
}

pub fn credential(token: &str) -> Credential {
    Credential::new(token).expect("non-empty token")
}

/// App over in-memory storage pointed at `base_url`; the storage handle is
/// returned so tests can seed or inspect persisted keys.
pub fn memory_app(base_url: &str) -> Result<(AdminApp, MemoryStorage)> {
    let storage = MemoryStorage::new();
    let app = AdminApp::with_storage(ClientConfig::in_memory(base_url), Arc::new(storage.clone()))?;
    Ok((app, storage))
}

pub fn seeded_app(base_url: &str, storage: MemoryStorage) -> Result<AdminApp> {
    AdminApp::with_storage(ClientConfig::in_memory(base_url), Arc::new(storage))
}

/// Identity provider that parks every call until released, so a test can
/// mutate the session while a response is in flight.
#[derive(Default)]
pub struct GatedProvider {
    pub entered: Notify,
    pub release: Notify,
    login: Mutex<Option<ApiResult<LoginResponse>>>,
    me: Mutex<Option<ApiResult<Value>>>,
}

impl GatedProvider {
    pub fn with_login(response: ApiResult<LoginResponse>) -> Arc<Self> {
        let provider = Self::default();
        *provider.login.lock().expect("lock") = Some(response);
        Arc::new(provider)
    }

    pub fn with_me(response: ApiResult<Value>) -> Arc<Self> {
        let provider = Self::default();
        *provider.me.lock().expect("lock") = Some(response);
        Arc::new(provider)
    }

    async fn park(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

fn unscripted<T>() -> ApiResult<T> {
    Err(ApiError::Malformed("no scripted response".into()))
}

#[async_trait]
impl IdentityProvider for GatedProvider {
    async fn login(&self, _email: &str, _password: &str) -> ApiResult<LoginResponse> {
        self.park().await;
        self.login.lock().expect("lock").take().unwrap_or_else(unscripted)
    }

    async fn current_user(&self, _credential: &Credential) -> ApiResult<Value> {
        self.park().await;
        self.me.lock().expect("lock").take().unwrap_or_else(unscripted)
    }
}
