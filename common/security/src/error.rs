use common_auth::Role;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("sign-in required")]
    Unauthenticated,
    #[error("role '{role}' is not in the route allow-list")]
    Forbidden { role: Role },
    #[error("route '{0}' declares an empty allow-list")]
    EmptyAllowList(String),
    #[error("route '{0}' is declared more than once")]
    DuplicateRoute(String),
    #[error("route path '{0}' must start with '/'")]
    InvalidPath(String),
}
