use std::fmt;

use http::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Opaque bearer token issued by the backend. Never decoded or validated
/// client-side; expiry is the backend's business.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> AuthResult<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(AuthError::EmptyCredential);
        }
        if trimmed.len() == token.len() {
            Ok(Self(token))
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value, flagged sensitive so it stays out of logs.
    pub fn authorization_value(&self) -> AuthResult<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))
            .map_err(|_| AuthError::InvalidAuthorization)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl TryFrom<String> for Credential {
    type Error = AuthError;

    fn try_from(value: String) -> AuthResult<Self> {
        Credential::new(value)
    }
}

impl From<Credential> for String {
    fn from(value: Credential) -> Self {
        value.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_surrounding_whitespace() {
        let credential = Credential::new("  abc.def.ghi\n").expect("credential");
        assert_eq!(credential.as_str(), "abc.def.ghi");
    }

    #[test]
    fn new_rejects_blank_token() {
        let err = Credential::new("   ").expect_err("should reject");
        assert!(matches!(err, AuthError::EmptyCredential));
    }

    #[test]
    fn authorization_value_is_bearer_and_sensitive() {
        let credential = Credential::new("abc").expect("credential");
        let header = credential.authorization_value().expect("header");
        assert_eq!(header, "Bearer abc");
        assert!(header.is_sensitive());
    }

    #[test]
    fn authorization_value_rejects_control_characters() {
        let credential = Credential::new("abc\u{7f}def").expect("credential");
        let err = credential.authorization_value().expect_err("invalid header");
        assert!(matches!(err, AuthError::InvalidAuthorization));
    }

    #[test]
    fn debug_output_is_redacted() {
        let credential = Credential::new("super-secret").expect("credential");
        assert!(!format!("{credential:?}").contains("super-secret"));
    }
}
