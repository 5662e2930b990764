use std::fmt;
use std::sync::Arc;

use common_auth::{AuthError, AuthResult, Credential, Principal};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::storage::{SessionStorage, TOKEN_KEY, USER_KEY};

/// Credential and principal as one pair. Only the complete pair counts as
/// signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub credential: Option<Credential>,
    pub principal: Option<Principal>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some() && self.principal.is_some()
    }

    /// The principal, but only when a credential backs it.
    pub fn authenticated_principal(&self) -> Option<&Principal> {
        self.credential.as_ref().and(self.principal.as_ref())
    }
}

/// Monotonic counter bumped whenever the credential is installed or cleared.
/// Responses started under an older generation must not write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Pending,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: Session,
    pub verification: Verification,
    pub generation: Generation,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn is_verifying(&self) -> bool {
        self.verification == Verification::Pending
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.session.authenticated_principal()
    }
}

/// Read side of the session, handed to everything that only looks at it.
pub trait SessionHandle: Send + Sync {
    fn snapshot(&self) -> SessionSnapshot;
    fn subscribe(&self) -> watch::Receiver<SessionSnapshot>;
}

/// Sole owner and writer of session state, in memory and in storage.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    /// Build the store from whatever a previous run persisted.
    pub fn hydrate(storage: Arc<dyn SessionStorage>) -> AuthResult<Self> {
        let (token, user) = match read_persisted(storage.as_ref()) {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "discarding unreadable session storage");
                storage.clear()?;
                (None, None)
            }
        };

        let credential = match token {
            Some(raw) => match Credential::new(raw) {
                Ok(credential) => Some(credential),
                Err(_) => {
                    storage.remove(TOKEN_KEY)?;
                    None
                }
            },
            None => None,
        };

        let mut principal = match user {
            Some(raw) => match serde_json::from_str::<Principal>(&raw) {
                Ok(principal) => Some(principal),
                Err(err) => {
                    warn!(error = %err, "discarding unreadable persisted principal");
                    storage.remove(USER_KEY)?;
                    None
                }
            },
            None => None,
        };

        if credential.is_none() && principal.take().is_some() {
            storage.remove(USER_KEY)?;
        }

        let verification = if credential.is_some() && principal.is_none() {
            Verification::Pending
        } else {
            Verification::Complete
        };

        let snapshot = SessionSnapshot {
            session: Session { credential, principal },
            verification,
            generation: Generation::default(),
        };
        info!(
            authenticated = snapshot.is_authenticated(),
            verifying = snapshot.is_verifying(),
            "session hydrated"
        );

        let (state, _) = watch::channel(snapshot);
        Ok(Self { storage, state })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Session {
        self.state.borrow().session.clone()
    }

    pub fn generation(&self) -> Generation {
        self.state.borrow().generation
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Install both halves unconditionally and start a new generation.
    pub fn set_session(&self, credential: Credential, principal: Principal) -> AuthResult<Generation> {
        let mut outcome = Ok(Generation::default());
        self.state.send_if_modified(|state| {
            if let Err(err) = self.persist(&credential, &principal) {
                outcome = Err(err);
                return false;
            }
            state.generation = state.generation.next();
            state.session = Session {
                credential: Some(credential),
                principal: Some(principal),
            };
            state.verification = Verification::Complete;
            outcome = Ok(state.generation);
            true
        });
        outcome
    }

    /// Install only if no install or clear happened since `expected` was read.
    /// Returns `false` when the write was discarded as stale.
    pub fn install_if_current(
        &self,
        expected: Generation,
        credential: Credential,
        principal: Principal,
    ) -> AuthResult<bool> {
        let mut outcome = Ok(false);
        self.state.send_if_modified(|state| {
            if state.generation != expected {
                return false;
            }
            if let Err(err) = self.persist(&credential, &principal) {
                outcome = Err(err);
                return false;
            }
            state.generation = state.generation.next();
            state.session = Session {
                credential: Some(credential),
                principal: Some(principal),
            };
            state.verification = Verification::Complete;
            outcome = Ok(true);
            true
        });
        if matches!(outcome, Ok(false)) {
            warn!(%expected, "discarding session install from a stale generation");
        }
        outcome
    }

    /// Drop both halves from memory and storage. Safe to call repeatedly.
    pub fn clear_session(&self) -> AuthResult<()> {
        let mut removed = Ok(());
        self.state.send_modify(|state| {
            state.generation = state.generation.next();
            state.session = Session::default();
            state.verification = Verification::Complete;

            let token = self.storage.remove(TOKEN_KEY);
            let user = self.storage.remove(USER_KEY);
            removed = token.and(user);
        });

        if let Err(err) = &removed {
            warn!(error = %err, "failed to remove persisted session");
        }
        removed
    }

    /// Replace the principal after a profile edit; the credential is untouched.
    pub fn update_principal(&self, principal: Principal) -> AuthResult<()> {
        let expected = self.generation();
        if self.update_principal_if_current(expected, principal)? {
            Ok(())
        } else {
            Err(AuthError::Superseded)
        }
    }

    /// Generation-guarded variant of [`SessionStore::update_principal`].
    pub fn update_principal_if_current(
        &self,
        expected: Generation,
        principal: Principal,
    ) -> AuthResult<bool> {
        let mut outcome = Ok(false);
        self.state.send_if_modified(|state| {
            if state.generation != expected {
                return false;
            }
            if state.session.credential.is_none() {
                outcome = Err(AuthError::Unauthenticated);
                return false;
            }
            if let Err(err) = self.persist_principal(&principal) {
                outcome = Err(err);
                return false;
            }
            state.session.principal = Some(principal);
            outcome = Ok(true);
            true
        });
        outcome
    }

    /// Mark verification as running when a credential has no principal yet.
    /// Returns what the verifier needs, or `None` when there is nothing to do.
    pub(crate) fn begin_verification(&self) -> Option<(Generation, Credential)> {
        let mut started = None;
        self.state.send_if_modified(|state| {
            let needs_lookup = state.session.principal.is_none();
            match (&state.session.credential, needs_lookup) {
                (Some(credential), true) => {
                    started = Some((state.generation, credential.clone()));
                    let changed = state.verification != Verification::Pending;
                    state.verification = Verification::Pending;
                    changed
                }
                _ => {
                    let changed = state.verification != Verification::Complete;
                    state.verification = Verification::Complete;
                    changed
                }
            }
        });
        started
    }

    pub(crate) fn finish_verification(&self, expected: Generation) {
        self.state.send_if_modified(|state| {
            if state.generation != expected || state.verification == Verification::Complete {
                return false;
            }
            state.verification = Verification::Complete;
            true
        });
    }

    /// The old `user` goes first, so a failure part-way leaves at most a
    /// token without a principal, which the next start re-verifies.
    fn persist(&self, credential: &Credential, principal: &Principal) -> AuthResult<()> {
        self.storage.remove(USER_KEY)?;
        self.storage.set(TOKEN_KEY, credential.as_str())?;
        self.persist_principal(principal)
    }

    fn persist_principal(&self, principal: &Principal) -> AuthResult<()> {
        let user = serde_json::to_string(principal)?;
        self.storage.set(USER_KEY, &user)
    }
}

fn read_persisted(storage: &dyn SessionStorage) -> AuthResult<(Option<String>, Option<String>)> {
    Ok((storage.get(TOKEN_KEY)?, storage.get(USER_KEY)?))
}

impl SessionHandle for SessionStore {
    fn snapshot(&self) -> SessionSnapshot {
        SessionStore::snapshot(self)
    }

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        SessionStore::subscribe(self)
    }
}
