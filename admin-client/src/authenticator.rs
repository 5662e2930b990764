use std::sync::Arc;

use common_auth::{AuthError, AuthResult, Credential, Principal};
use common_http_errors::ApiError;
use common_observability::SessionMetrics;
use tracing::{info, warn};

use crate::backend::IdentityProvider;
use crate::session::SessionStore;

/// Turns an email/password pair into an installed session.
///
/// No de-duplication happens here: the form is expected to disable
/// re-submission while a call is outstanding.
pub struct Authenticator {
    store: Arc<SessionStore>,
    provider: Arc<dyn IdentityProvider>,
    metrics: Arc<SessionMetrics>,
}

impl Authenticator {
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self { store, provider, metrics }
    }

    /// On success the session holds the new pair and the principal is
    /// returned; navigation is left to the caller. On failure the session is
    /// untouched.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Principal> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if password.trim().is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let generation = self.store.generation();
        let result = self.attempt(email, password).await;

        let (credential, principal) = match result {
            Ok(pair) => pair,
            Err(err) => {
                let outcome = match &err {
                    AuthError::BackendUnavailable(_) => "unavailable",
                    AuthError::InvalidResponse => "invalid_response",
                    _ => "rejected",
                };
                self.metrics.login_attempt(outcome);
                warn!(outcome, error = %err, "sign-in failed");
                return Err(err);
            }
        };

        if !self
            .store
            .install_if_current(generation, credential, principal.clone())?
        {
            self.metrics.login_attempt("superseded");
            return Err(AuthError::Superseded);
        }

        self.metrics.login_attempt("success");
        info!(
            principal_id = %principal.id,
            role = %principal.role,
            tenant_id = principal.tenant_id().unwrap_or("-"),
            "signed in"
        );
        Ok(principal)
    }

    async fn attempt(&self, email: &str, password: &str) -> AuthResult<(Credential, Principal)> {
        let response = self
            .provider
            .login(email, password)
            .await
            .map_err(|err| match err {
                ApiError::Rejected { message, .. } => AuthError::AuthenticationFailed(message),
                other => AuthError::from(other),
            })?;

        let (Some(token), Some(user)) = (response.token, response.user) else {
            return Err(AuthError::InvalidResponse);
        };
        let credential = Credential::new(token).map_err(|_| AuthError::InvalidResponse)?;
        let principal = Principal::try_from(user).map_err(|err| {
            warn!(error = %err, "login returned an unusable user");
            AuthError::InvalidResponse
        })?;
        Ok((credential, principal))
    }
}
