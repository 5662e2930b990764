use common_http_errors::ApiError;
use thiserror::Error;

use crate::roles::Role;

pub type AuthResult<T> = Result<T, AuthError>;

/// The four failure classes a caller has to react to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Shown inline next to the form; the user may retry.
    AuthenticationFailure,
    /// The credential is dead; the session is cleared and the user signs in again.
    SessionInvalid,
    /// Redirect to the access-denied view; the session is untouched.
    AuthorizationDenied,
    /// Generic error string for the invoking view; retried manually.
    BackendUnavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("credential is empty")]
    EmptyCredential,
    #[error("invalid principal field '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("malformed principal payload: {0}")]
    InvalidJson(String),
    #[error("{0}")]
    AuthenticationFailed(String),
    #[error("Invalid response from server")]
    InvalidResponse,
    #[error("session is no longer valid: {0}")]
    SessionInvalid(String),
    #[error("not signed in")]
    Unauthenticated,
    #[error("role '{role}' is not permitted here")]
    Forbidden { role: Role, required: Vec<Role> },
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("{0}")]
    BackendUnavailable(String),
    #[error("session changed while the request was in flight")]
    Superseded,
    #[error("session storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    Validation(String),
    #[error("authorization header malformed")]
    InvalidAuthorization,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingField(_)
            | AuthError::AuthenticationFailed(_)
            | AuthError::InvalidResponse
            | AuthError::Superseded
            | AuthError::Validation(_) => ErrorKind::AuthenticationFailure,
            AuthError::SessionInvalid(_) | AuthError::Unauthenticated => {
                ErrorKind::SessionInvalid
            }
            AuthError::Forbidden { .. } => ErrorKind::AuthorizationDenied,
            AuthError::Rejected { status, .. } => match *status {
                401 => ErrorKind::SessionInvalid,
                403 => ErrorKind::AuthorizationDenied,
                _ => ErrorKind::BackendUnavailable,
            },
            AuthError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            AuthError::EmptyCredential
            | AuthError::InvalidClaim(_, _)
            | AuthError::InvalidJson(_)
            | AuthError::Storage(_)
            | AuthError::InvalidAuthorization => ErrorKind::Internal,
        }
    }

    /// Text a view can render as-is.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::SessionInvalid => "Your session has expired. Please sign in again.".into(),
            ErrorKind::AuthorizationDenied => {
                "You don't have permission to access this page.".into()
            }
            ErrorKind::Internal => "Something went wrong".into(),
            ErrorKind::AuthenticationFailure | ErrorKind::BackendUnavailable => self.to_string(),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::Rejected { status, message } => AuthError::Rejected {
                status: status.as_u16(),
                message,
            },
            ApiError::Unavailable { message, .. } => AuthError::BackendUnavailable(message),
            ApiError::Malformed(_) => AuthError::InvalidResponse,
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidJson(value.to_string())
    }
}
