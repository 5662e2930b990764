use std::fmt;
use std::sync::Arc;

use common_auth::{ensure_role, AuthError, AuthResult, Credential, Principal, Role};
use common_http_errors::{extract_list, extract_record};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::backend::ApiClient;
use crate::session::SessionHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Members,
    Trainers,
    Tenants,
    Plans,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Users,
        Resource::Members,
        Resource::Trainers,
        Resource::Tenants,
        Resource::Plans,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Resource::Users => "/users",
            Resource::Members => "/members",
            Resource::Trainers => "/trainers",
            Resource::Tenants => "/tenants",
            Resource::Plans => "/plans",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantStatus {
    Active,
    Inactive,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Inactive => "inactive",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            TenantStatus::Active => TenantStatus::Inactive,
            TenantStatus::Inactive => TenantStatus::Active,
        }
    }
}

/// Staff/member account created from the users screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self, creator: &Principal) -> AuthResult<()> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
        {
            return Err(AuthError::Validation("All fields are required".into()));
        }
        if !creatable_roles(creator).contains(&self.role) {
            return Err(AuthError::Validation(format!(
                "{} cannot create {} accounts",
                creator.role, self.role
            )));
        }
        Ok(())
    }
}

/// Roles the given creator may assign to a new account.
pub fn creatable_roles(creator: &Principal) -> Vec<Role> {
    let mut roles = vec![Role::Member, Role::Frontdesk, Role::Trainer];
    if creator.role == Role::Owner {
        roles.push(Role::Manager);
    }
    roles
}

const USER_ADMINS: [Role; 2] = [Role::SuperAdmin, Role::Owner];

/// Authenticated list/create access to the dashboard collections.
pub struct ResourceClient {
    session: Arc<dyn SessionHandle>,
    api: ApiClient,
}

impl ResourceClient {
    pub fn new(session: Arc<dyn SessionHandle>, api: ApiClient) -> Self {
        Self { session, api }
    }

    pub async fn list(&self, resource: Resource) -> AuthResult<Vec<Value>> {
        let (credential, _) = self.signed_in()?;
        let body = self.api.get(resource.path(), Some(&credential)).await?;
        Ok(extract_list(body)?)
    }

    pub async fn create(&self, resource: Resource, record: &Value) -> AuthResult<Value> {
        let (credential, principal) = self.signed_in()?;
        let body = self
            .api
            .post(resource.path(), Some(&credential), record)
            .await?;
        info!(%resource, principal_id = %principal.id, "record created");
        Ok(extract_record(body))
    }

    pub async fn create_user(&self, user: &NewUser) -> AuthResult<Value> {
        let (_, principal) = self.signed_in()?;
        ensure_role(&principal, &USER_ADMINS)?;
        user.validate(&principal)?;
        let record = json!({
            "name": user.name.trim(),
            "email": user.email.trim(),
            "password": user.password,
            "role": user.role,
        });
        self.create(Resource::Users, &record).await
    }

    pub async fn set_tenant_status(&self, tenant_id: &str, status: TenantStatus) -> AuthResult<Value> {
        let (credential, principal) = self.signed_in()?;
        ensure_role(&principal, &[Role::SuperAdmin])?;
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(AuthError::MissingField("tenant id"));
        }

        let path = format!("{}/{}", Resource::Tenants.path(), tenant_id);
        let body = self
            .api
            .put(&path, Some(&credential), &json!({ "status": status.as_str() }))
            .await?;
        info!(tenant_id, status = status.as_str(), "tenant status changed");
        Ok(extract_record(body))
    }

    fn signed_in(&self) -> AuthResult<(Credential, Principal)> {
        let snapshot = self.session.snapshot();
        match (snapshot.session.credential, snapshot.session.principal) {
            (Some(credential), Some(principal)) => Ok((credential, principal)),
            _ => Err(AuthError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_auth::TenantScope;

    fn principal(role: Role) -> Principal {
        Principal {
            id: "p1".into(),
            name: "Pat".into(),
            email: "pat@gym.test".into(),
            tenant: if role == Role::SuperAdmin {
                TenantScope::Global
            } else {
                TenantScope::Tenant("gym-1".into())
            },
            role,
        }
    }

    fn new_user(role: Role) -> NewUser {
        NewUser {
            name: "Sam".into(),
            email: "sam@gym.test".into(),
            password: "secret1".into(),
            role,
        }
    }

    #[test]
    fn only_owners_may_create_managers() {
        let owner = principal(Role::Owner);
        let admin = principal(Role::SuperAdmin);
        assert!(creatable_roles(&owner).contains(&Role::Manager));
        assert!(!creatable_roles(&admin).contains(&Role::Manager));

        new_user(Role::Manager).validate(&owner).expect("owner creates manager");
        let err = new_user(Role::Manager).validate(&admin).unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[test]
    fn owner_role_is_never_creatable() {
        let owner = principal(Role::Owner);
        assert!(new_user(Role::Owner).validate(&owner).is_err());
        assert!(new_user(Role::SuperAdmin).validate(&owner).is_err());
    }

    #[test]
    fn blank_fields_are_rejected() {
        let owner = principal(Role::Owner);
        let mut user = new_user(Role::Member);
        user.email = "   ".into();
        let err = user.validate(&owner).unwrap_err();
        assert_eq!(err.to_string(), "All fields are required");
    }

    #[test]
    fn resource_paths_and_labels() {
        assert_eq!(Resource::Plans.path(), "/plans");
        assert_eq!(Resource::Tenants.to_string(), "tenants");
        assert_eq!(TenantStatus::Active.toggled(), TenantStatus::Inactive);
    }
}
