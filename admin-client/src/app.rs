use std::sync::Arc;

use anyhow::{Context, Result};
use common_auth::AuthResult;
use common_observability::SessionMetrics;
use common_security::RouteTable;
use tracing::info;

use crate::authenticator::Authenticator;
use crate::backend::{ApiClient, IdentityProvider};
use crate::config::{ClientConfig, StorageKind};
use crate::guard::{Navigator, RouteGuard};
use crate::profile::ProfileService;
use crate::resources::ResourceClient;
use crate::session::{SessionHandle, SessionStore};
use crate::storage::{FileStorage, MemoryStorage, SessionStorage};
use crate::verifier::{IdentityVerifier, VerificationOutcome};

/// Everything the dashboard shares: one session store, one backend client,
/// one route table and one metrics registry.
#[derive(Clone)]
pub struct AdminApp {
    pub config: Arc<ClientConfig>,
    pub session: Arc<SessionStore>,
    pub api: ApiClient,
    pub metrics: Arc<SessionMetrics>,
    pub routes: Arc<RouteTable>,
    provider: Arc<dyn IdentityProvider>,
}

impl AdminApp {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let storage: Arc<dyn SessionStorage> = match config.storage {
            StorageKind::File => Arc::new(FileStorage::new(config.session_file.clone())),
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
        };
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let metrics = Arc::new(SessionMetrics::new().context("Failed to register session metrics")?);
        let api = ApiClient::new(config.api_base_url.clone()).with_metrics(metrics.clone());
        let provider: Arc<dyn IdentityProvider> = Arc::new(api.clone());
        Self::assemble(config, storage, api, provider, metrics)
    }

    /// Same wiring with a substitute identity provider.
    pub fn with_provider(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let metrics = Arc::new(SessionMetrics::new().context("Failed to register session metrics")?);
        let api = ApiClient::new(config.api_base_url.clone()).with_metrics(metrics.clone());
        Self::assemble(config, storage, api, provider, metrics)
    }

    fn assemble(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        api: ApiClient,
        provider: Arc<dyn IdentityProvider>,
        metrics: Arc<SessionMetrics>,
    ) -> Result<Self> {
        let session =
            Arc::new(SessionStore::hydrate(storage).context("Failed to load persisted session")?);
        Ok(Self {
            config: Arc::new(config),
            session,
            api,
            metrics,
            routes: Arc::new(RouteTable::gym_dashboard()),
            provider,
        })
    }

    /// Resolve a stored credential left over from a previous run.
    pub async fn start(&self) -> VerificationOutcome {
        let outcome = self.verifier().verify().await;
        info!(
            authenticated = self.session.is_authenticated(),
            generation = %self.session.generation(),
            "session ready"
        );
        outcome
    }

    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(self.session.clone(), self.provider.clone(), self.metrics.clone())
    }

    pub fn verifier(&self) -> IdentityVerifier {
        IdentityVerifier::new(self.session.clone(), self.provider.clone(), self.metrics.clone())
    }

    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.routes.clone()).with_metrics(self.metrics.clone())
    }

    pub fn navigator(&self, start: impl Into<String>) -> Navigator {
        Navigator::new(self.session.as_ref(), self.guard(), start)
    }

    pub fn resources(&self) -> ResourceClient {
        let handle: Arc<dyn SessionHandle> = self.session.clone();
        ResourceClient::new(handle, self.api.clone())
    }

    pub fn profiles(&self) -> ProfileService {
        ProfileService::new(self.session.clone(), self.api.clone())
    }

    pub fn sign_out(&self) -> AuthResult<()> {
        self.session.clear_session()?;
        self.metrics.session_cleared("sign_out");
        info!("signed out");
        Ok(())
    }
}
