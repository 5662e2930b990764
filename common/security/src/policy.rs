use std::collections::HashMap;

use common_auth::{Principal, Role};

use crate::SecurityError;

pub const SIGN_IN_PATH: &str = "/signin";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const HOME_PATH: &str = "/home";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    AnyAuthenticated,
    Roles(Vec<Role>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: String,
    pub access: RouteAccess,
}

impl RouteDescriptor {
    pub fn public(path: impl Into<String>) -> Self {
        Self { path: path.into(), access: RouteAccess::Public }
    }

    pub fn any_authenticated(path: impl Into<String>) -> Self {
        Self { path: path.into(), access: RouteAccess::AnyAuthenticated }
    }

    pub fn roles(path: impl Into<String>, roles: &[Role]) -> Self {
        Self { path: path.into(), access: RouteAccess::Roles(roles.to_vec()) }
    }

    pub fn is_public(&self) -> bool {
        self.access == RouteAccess::Public
    }
}

/// Decide whether `principal` (None when signed out) may open a route with
/// the given access rule.
pub fn ensure_access(principal: Option<&Principal>, access: &RouteAccess) -> Result<(), SecurityError> {
    let principal = match (access, principal) {
        (RouteAccess::Public, _) => return Ok(()),
        (_, None) => return Err(SecurityError::Unauthenticated),
        (_, Some(principal)) => principal,
    };

    match access {
        RouteAccess::AnyAuthenticated => Ok(()),
        RouteAccess::Roles(allowed)
            if principal.role.is_known() && allowed.contains(&principal.role) =>
        {
            Ok(())
        }
        RouteAccess::Roles(_) => Err(SecurityError::Forbidden {
            role: principal.role.clone(),
        }),
        RouteAccess::Public => Ok(()),
    }
}

/// Lookup table of every routable view.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDescriptor>) -> Result<Self, SecurityError> {
        let mut index = HashMap::with_capacity(routes.len());
        for (position, route) in routes.iter().enumerate() {
            if !route.path.starts_with('/') {
                return Err(SecurityError::InvalidPath(route.path.clone()));
            }
            if matches!(&route.access, RouteAccess::Roles(roles) if roles.is_empty()) {
                return Err(SecurityError::EmptyAllowList(route.path.clone()));
            }
            if index.insert(normalize_path(&route.path), position).is_some() {
                return Err(SecurityError::DuplicateRoute(route.path.clone()));
            }
        }
        Ok(Self { routes, index })
    }

    /// Routes of the gym dashboard.
    pub fn gym_dashboard() -> Self {
        use Role::*;

        let everyone = [SuperAdmin, Owner, Frontdesk, Trainer, Member];
        let routes = vec![
            RouteDescriptor::public("/"),
            RouteDescriptor::public(SIGN_IN_PATH),
            RouteDescriptor::public("/signup"),
            RouteDescriptor::public("/register"),
            RouteDescriptor::public(UNAUTHORIZED_PATH),
            RouteDescriptor::roles(HOME_PATH, &everyone),
            RouteDescriptor::roles("/members", &[SuperAdmin, Owner, Frontdesk]),
            RouteDescriptor::roles("/users", &[SuperAdmin, Owner]),
            RouteDescriptor::roles("/AdminDashboard", &[SuperAdmin]),
            RouteDescriptor::roles("/admin/CreateGymForm", &[SuperAdmin]),
            RouteDescriptor::roles("/admin/ShowOwnerList", &[SuperAdmin]),
            RouteDescriptor::roles("/admin/activeDeactive", &[SuperAdmin]),
            RouteDescriptor::roles("/staff", &[SuperAdmin]),
            RouteDescriptor::roles("/trainerdashboard", &[Owner]),
            RouteDescriptor::roles("/trainer/assignedmembers", &[Owner]),
            RouteDescriptor::roles("/frontdeskFeature", &[Owner, Frontdesk]),
            RouteDescriptor::roles("/createtrainer", &[Owner, Frontdesk]),
            RouteDescriptor::roles("/createmember", &[Owner, Frontdesk]),
            RouteDescriptor::roles("/trainer/profile", &everyone),
            RouteDescriptor::roles("/trainer/showlist", &everyone),
        ];

        match Self::new(routes) {
            Ok(table) => table,
            Err(err) => unreachable!("built-in route table is invalid: {err}"),
        }
    }

    pub fn resolve(&self, path: &str) -> Option<&RouteDescriptor> {
        self.index
            .get(&normalize_path(path))
            .and_then(|position| self.routes.get(*position))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    /// Protected routes the principal may open, in declaration order.
    pub fn accessible_for<'a>(&'a self, principal: &'a Principal) -> impl Iterator<Item = &'a RouteDescriptor> + 'a {
        self.routes
            .iter()
            .filter(|route| !route.is_public())
            .filter(move |route| ensure_access(Some(principal), &route.access).is_ok())
    }
}

/// Strip query/fragment and a trailing slash; matching is ASCII
/// case-insensitive like the browser router it replaces.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}
