use std::sync::Arc;

use common_observability::SessionMetrics;
use common_security::{
    ensure_access, RouteDescriptor, RouteTable, SecurityError, SIGN_IN_PATH, UNAUTHORIZED_PATH,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::session::{SessionHandle, SessionSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Identity verification is still running; render a placeholder.
    Loading,
    Render,
    RedirectToSignIn,
    RedirectToUnauthorized,
    NotFound,
}

impl GuardDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardDecision::Loading => "loading",
            GuardDecision::Render => "render",
            GuardDecision::RedirectToSignIn => "redirect_sign_in",
            GuardDecision::RedirectToUnauthorized => "redirect_unauthorized",
            GuardDecision::NotFound => "not_found",
        }
    }

    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            GuardDecision::RedirectToSignIn => Some(SIGN_IN_PATH),
            GuardDecision::RedirectToUnauthorized => Some(UNAUTHORIZED_PATH),
            _ => None,
        }
    }
}

/// Pure decision for one route against one session snapshot.
pub fn decide(snapshot: &SessionSnapshot, route: &RouteDescriptor) -> GuardDecision {
    if snapshot.is_verifying() {
        return GuardDecision::Loading;
    }
    match ensure_access(snapshot.principal(), &route.access) {
        Ok(()) => GuardDecision::Render,
        Err(SecurityError::Unauthenticated) => GuardDecision::RedirectToSignIn,
        Err(_) => GuardDecision::RedirectToUnauthorized,
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    routes: Arc<RouteTable>,
    metrics: Option<Arc<SessionMetrics>>,
}

impl RouteGuard {
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn evaluate(&self, snapshot: &SessionSnapshot, path: &str) -> GuardDecision {
        let decision = match self.routes.resolve(path) {
            _ if snapshot.is_verifying() => GuardDecision::Loading,
            Some(route) => decide(snapshot, route),
            None => GuardDecision::NotFound,
        };

        if let Some(metrics) = &self.metrics {
            metrics.guard_decision(decision.as_str());
        }
        if decision == GuardDecision::RedirectToUnauthorized {
            warn!(
                path,
                role = snapshot.principal().map(|p| p.role.as_str()).unwrap_or("-"),
                "route denied"
            );
        } else {
            debug!(path, decision = decision.as_str(), "route evaluated");
        }
        decision
    }
}

/// Outcome of one navigation: what was asked for, what the guard said, and
/// the path that ends up on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: String,
    pub decision: GuardDecision,
    pub location: String,
}

/// Tracks the requested location and re-runs the guard whenever it moves or
/// the session changes, so no decision outlives the session it was made for.
pub struct Navigator {
    guard: RouteGuard,
    receiver: watch::Receiver<SessionSnapshot>,
    requested: String,
}

impl Navigator {
    pub fn new(session: &dyn SessionHandle, guard: RouteGuard, start: impl Into<String>) -> Self {
        Self {
            guard,
            receiver: session.subscribe(),
            requested: start.into(),
        }
    }

    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn navigate(&mut self, path: impl Into<String>) -> Navigation {
        self.requested = path.into();
        self.current()
    }

    /// Re-evaluate the requested location against the latest session.
    pub fn current(&mut self) -> Navigation {
        let snapshot = self.receiver.borrow_and_update().clone();
        let decision = self.guard.evaluate(&snapshot, &self.requested);
        let location = decision
            .redirect_target()
            .map(str::to_string)
            .unwrap_or_else(|| self.requested.clone());
        Navigation {
            requested: self.requested.clone(),
            decision,
            location,
        }
    }

    /// Wait for the next session mutation and re-evaluate. `None` once the
    /// session store is gone.
    pub async fn session_changed(&mut self) -> Option<Navigation> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Generation, Session, Verification};
    use common_auth::{Credential, Principal, Role, TenantScope};

    fn snapshot(role: Option<Role>, verification: Verification) -> SessionSnapshot {
        let session = match role {
            Some(role) => Session {
                credential: Some(Credential::new("abc").expect("credential")),
                principal: Some(Principal {
                    id: "1".into(),
                    name: "Test".into(),
                    email: "t@gym.test".into(),
                    tenant: if role.is_tenant_scoped() {
                        TenantScope::Tenant("gym-1".into())
                    } else {
                        TenantScope::Global
                    },
                    role,
                }),
            },
            None => Session::default(),
        };
        SessionSnapshot {
            session,
            verification,
            generation: Generation::default(),
        }
    }

    fn guard() -> RouteGuard {
        RouteGuard::new(Arc::new(RouteTable::gym_dashboard()))
    }

    #[test]
    fn verification_in_progress_suspends_every_route() {
        let pending = snapshot(None, Verification::Pending);
        for path in ["/signin", "/home", "/users", "/missing"] {
            assert_eq!(guard().evaluate(&pending, path), GuardDecision::Loading);
        }
    }

    #[test]
    fn signed_out_visitor_sees_public_and_is_sent_to_sign_in() {
        let anonymous = snapshot(None, Verification::Complete);
        assert_eq!(guard().evaluate(&anonymous, "/signin"), GuardDecision::Render);
        assert_eq!(guard().evaluate(&anonymous, "/register"), GuardDecision::Render);
        assert_eq!(guard().evaluate(&anonymous, "/home"), GuardDecision::RedirectToSignIn);
        assert_eq!(guard().evaluate(&anonymous, "/staff"), GuardDecision::RedirectToSignIn);
    }

    #[test]
    fn member_hitting_admin_route_is_unauthorized() {
        let member = snapshot(Some(Role::Member), Verification::Complete);
        let decision = guard().evaluate(&member, "/users");
        assert_eq!(decision, GuardDecision::RedirectToUnauthorized);
        assert_eq!(decision.redirect_target(), Some("/unauthorized"));
        assert_eq!(guard().evaluate(&member, "/home"), GuardDecision::Render);
    }

    #[test]
    fn any_authenticated_route_admits_unknown_roles() {
        let table = RouteTable::new(vec![
            RouteDescriptor::any_authenticated("/inbox"),
            RouteDescriptor::roles("/home", &[Role::Owner]),
        ])
        .expect("table");
        let guard = RouteGuard::new(Arc::new(table));
        let odd = snapshot(Some(Role::Unknown("Owner".into())), Verification::Complete);
        assert_eq!(guard.evaluate(&odd, "/inbox"), GuardDecision::Render);
        assert_eq!(guard.evaluate(&odd, "/home"), GuardDecision::RedirectToUnauthorized);
    }

    #[test]
    fn principal_without_credential_is_not_signed_in() {
        let mut orphan = snapshot(Some(Role::SuperAdmin), Verification::Complete);
        orphan.session.credential = None;
        assert_eq!(guard().evaluate(&orphan, "/staff"), GuardDecision::RedirectToSignIn);
    }

    #[test]
    fn empty_allow_list_descriptor_fails_closed() {
        let route = RouteDescriptor::roles("/broken", &[]);
        let owner = snapshot(Some(Role::Owner), Verification::Complete);
        assert_eq!(decide(&owner, &route), GuardDecision::RedirectToUnauthorized);
    }

    #[test]
    fn unknown_path_is_not_found() {
        let owner = snapshot(Some(Role::Owner), Verification::Complete);
        assert_eq!(guard().evaluate(&owner, "/nope"), GuardDecision::NotFound);
    }
}
