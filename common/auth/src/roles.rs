use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const ROLE_SUPER_ADMIN: &str = "superadmin";
pub const ROLE_OWNER: &str = "owner";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_TRAINER: &str = "trainer";
pub const ROLE_FRONTDESK: &str = "frontdesk";
pub const ROLE_MEMBER: &str = "member";

/// Closed set of dashboard roles. Anything the backend sends outside the set
/// is kept verbatim in `Unknown` and never matches an allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Owner,
    Manager,
    Trainer,
    Frontdesk,
    Member,
    Unknown(String),
}

impl Role {
    pub const KNOWN: [Role; 6] = [
        Role::SuperAdmin,
        Role::Owner,
        Role::Manager,
        Role::Trainer,
        Role::Frontdesk,
        Role::Member,
    ];

    /// Exact, case-sensitive match against the wire names.
    pub fn parse(value: &str) -> Self {
        match value {
            ROLE_SUPER_ADMIN => Role::SuperAdmin,
            ROLE_OWNER => Role::Owner,
            ROLE_MANAGER => Role::Manager,
            ROLE_TRAINER => Role::Trainer,
            ROLE_FRONTDESK => Role::Frontdesk,
            ROLE_MEMBER => Role::Member,
            other => Role::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => ROLE_SUPER_ADMIN,
            Role::Owner => ROLE_OWNER,
            Role::Manager => ROLE_MANAGER,
            Role::Trainer => ROLE_TRAINER,
            Role::Frontdesk => ROLE_FRONTDESK,
            Role::Member => ROLE_MEMBER,
            Role::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Role::Unknown(_))
    }

    /// Every role except superadmin belongs to exactly one tenant.
    pub fn is_tenant_scoped(&self) -> bool {
        !matches!(self, Role::SuperAdmin)
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Role::parse(s))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_exact_and_case_sensitive() {
        assert_eq!(Role::parse("owner"), Role::Owner);
        assert_eq!(Role::parse("superadmin"), Role::SuperAdmin);
        assert_eq!(Role::parse("Owner"), Role::Unknown("Owner".into()));
        assert_eq!(Role::parse("super_admin"), Role::Unknown("super_admin".into()));
        assert!(!Role::parse(" member").is_known());
    }

    #[test]
    fn known_roles_round_trip_through_wire_names() {
        for role in Role::KNOWN {
            assert_eq!(Role::parse(role.as_str()), role);
            let json = serde_json::to_string(&role).expect("serialize");
            let back: Role = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, role);
        }
    }

    #[test]
    fn unknown_role_keeps_raw_value() {
        let role: Role = serde_json::from_str("\"Janitor\"").expect("deserialize");
        assert_eq!(role, Role::Unknown("Janitor".into()));
        assert_eq!(serde_json::to_string(&role).expect("serialize"), "\"Janitor\"");
        assert!(role.is_tenant_scoped());
    }

    #[test]
    fn only_superadmin_is_global() {
        let global: Vec<_> = Role::KNOWN
            .into_iter()
            .filter(|role| !role.is_tenant_scoped())
            .collect();
        assert_eq!(global, vec![Role::SuperAdmin]);
    }
}
