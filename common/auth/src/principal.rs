use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::roles::Role;

/// Which tenant (gym) a principal is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantScope {
    Global,
    Tenant(String),
}

impl TenantScope {
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            TenantScope::Global => None,
            TenantScope::Tenant(id) => Some(id),
        }
    }
}

/// The authenticated identity. Only meaningful next to a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrincipalRepr", into = "PrincipalRepr")]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub tenant: TenantScope,
}

impl Principal {
    pub fn has_role(&self, role: &Role) -> bool {
        self.role == *role
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant.tenant_id()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PrincipalRepr {
    #[serde(alias = "_id")]
    id: String,
    name: String,
    email: String,
    role: String,
    #[serde(rename = "tenantId", default)]
    tenant_id: Option<String>,
}

impl TryFrom<PrincipalRepr> for Principal {
    type Error = AuthError;

    fn try_from(value: PrincipalRepr) -> AuthResult<Self> {
        let id = value.id.trim().to_string();
        if id.is_empty() {
            return Err(AuthError::InvalidClaim("id", value.id));
        }

        let role = Role::parse(&value.role);
        let tenant = if role.is_tenant_scoped() {
            match value.tenant_id.as_deref().map(str::trim) {
                Some(tenant) if !tenant.is_empty() => TenantScope::Tenant(tenant.to_string()),
                _ => {
                    return Err(AuthError::InvalidClaim(
                        "tenantId",
                        value.tenant_id.clone().unwrap_or_default(),
                    ))
                }
            }
        } else {
            TenantScope::Global
        };

        Ok(Self {
            id,
            name: value.name,
            email: value.email,
            role,
            tenant,
        })
    }
}

impl From<Principal> for PrincipalRepr {
    fn from(value: Principal) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            role: value.role.into(),
            tenant_id: match value.tenant {
                TenantScope::Global => None,
                TenantScope::Tenant(id) => Some(id),
            },
        }
    }
}

impl TryFrom<serde_json::Value> for Principal {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: PrincipalRepr = serde_json::from_value(value)?;
        Principal::try_from(repr)
    }
}
