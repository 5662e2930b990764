use std::sync::Arc;

use common_auth::{AuthError, Principal};
use common_observability::SessionMetrics;
use serde_json::Value;
use tracing::{info, warn};

use crate::backend::IdentityProvider;
use crate::session::{Generation, SessionStore};

#[derive(Debug)]
pub enum VerificationOutcome {
    /// No credential, or the principal is already known.
    Skipped,
    Verified(Principal),
    /// The credential could not be resolved and the session was cleared.
    Invalidated(AuthError),
    /// The session changed while the lookup was in flight; result dropped.
    Discarded,
}

/// Resolves a stored credential to its principal on startup.
pub struct IdentityVerifier {
    store: Arc<SessionStore>,
    provider: Arc<dyn IdentityProvider>,
    metrics: Arc<SessionMetrics>,
}

impl IdentityVerifier {
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self { store, provider, metrics }
    }

    pub async fn verify(&self) -> VerificationOutcome {
        let Some((generation, credential)) = self.store.begin_verification() else {
            return VerificationOutcome::Skipped;
        };

        let resolved = match self.provider.current_user(&credential).await {
            Ok(body) => principal_from_body(body),
            Err(err) => Err(AuthError::SessionInvalid(err.to_string())),
        };

        match resolved {
            Ok(principal) => {
                match self
                    .store
                    .install_if_current(generation, credential, principal.clone())
                {
                    Ok(true) => {
                        self.metrics.identity_check("verified");
                        info!(principal_id = %principal.id, role = %principal.role, "identity verified");
                        VerificationOutcome::Verified(principal)
                    }
                    Ok(false) => self.discard(generation),
                    Err(err) => self.invalidate(generation, err),
                }
            }
            Err(err) => self.invalidate(generation, err),
        }
    }

    fn invalidate(&self, generation: Generation, err: AuthError) -> VerificationOutcome {
        if self.store.generation() != generation {
            return self.discard(generation);
        }

        warn!(error = %err, "stored credential rejected, clearing session");
        if let Err(clear_err) = self.store.clear_session() {
            warn!(error = %clear_err, "session cleared in memory only");
        }
        self.metrics.identity_check("invalid");
        self.metrics.session_cleared("identity_invalid");
        let err = match err {
            AuthError::SessionInvalid(_) => err,
            other => AuthError::SessionInvalid(other.to_string()),
        };
        VerificationOutcome::Invalidated(err)
    }

    fn discard(&self, generation: Generation) -> VerificationOutcome {
        self.store.finish_verification(generation);
        self.metrics.identity_check("discarded");
        warn!(%generation, "identity lookup outlived its session, result dropped");
        VerificationOutcome::Discarded
    }
}

/// `/auth/me` answers either `{ "user": {..} }` or the user object itself.
pub(crate) fn principal_from_body(body: Value) -> Result<Principal, AuthError> {
    let user = match body {
        Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
            map.remove("user").unwrap_or(Value::Null)
        }
        other => other,
    };
    if !user.is_object() {
        return Err(AuthError::SessionInvalid("who-am-I returned no user".into()));
    }
    Principal::try_from(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_auth::Role;
    use serde_json::json;

    #[test]
    fn wrapped_and_bare_user_bodies_both_parse() {
        let user = json!({
            "_id": "7",
            "name": "Tara",
            "email": "tara@gym.test",
            "role": "trainer",
            "tenantId": "gym-1"
        });
        let wrapped = principal_from_body(json!({ "success": true, "user": user.clone() }))
            .expect("wrapped");
        let bare = principal_from_body(user).expect("bare");
        assert_eq!(wrapped, bare);
        assert_eq!(bare.role, Role::Trainer);
    }

    #[test]
    fn body_without_user_is_invalid() {
        let err = principal_from_body(json!({ "success": false })).expect_err("no user");
        assert!(matches!(err, AuthError::InvalidJson(_)));

        let err = principal_from_body(Value::Null).expect_err("null");
        assert!(matches!(err, AuthError::SessionInvalid(_)));
    }
}
