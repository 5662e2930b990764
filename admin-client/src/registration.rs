use serde_json::{json, Value};
use tracing::info;

use common_auth::{AuthError, AuthResult};
use common_http_errors::extract_record;

use crate::backend::ApiClient;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDetails {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantDetails {
    pub name: String,
    pub domain: String,
    pub contact_email: String,
}

/// Public sign-up: either the platform super admin, or a gym together with
/// its owner account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    SuperAdmin(AccountDetails),
    Tenant {
        owner: AccountDetails,
        tenant: TenantDetails,
    },
}

impl Registration {
    fn account(&self) -> &AccountDetails {
        match self {
            Registration::SuperAdmin(account) => account,
            Registration::Tenant { owner, .. } => owner,
        }
    }

    pub fn validate(&self) -> AuthResult<()> {
        let account = self.account();
        if [&account.name, &account.email, &account.password, &account.confirm_password]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(invalid("All fields are required"));
        }
        if account.password != account.confirm_password {
            return Err(invalid("Passwords do not match"));
        }
        if account.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(invalid("Password must be at least 6 characters long"));
        }
        if let Registration::Tenant { tenant, .. } = self {
            if tenant.name.is_empty() || tenant.domain.is_empty() || tenant.contact_email.is_empty() {
                return Err(invalid("All tenant fields are required"));
            }
        }
        Ok(())
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Registration::SuperAdmin(_) => "/setup/superadmin",
            Registration::Tenant { .. } => "/tenants",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Registration::SuperAdmin(account) => json!({
                "name": account.name,
                "email": account.email,
                "password": account.password,
            }),
            Registration::Tenant { owner, tenant } => json!({
                "name": tenant.name,
                "domain": tenant.domain,
                "contactEmail": tenant.contact_email,
                "ownerName": owner.name,
                "ownerEmail": owner.email,
                "ownerPassword": owner.password,
            }),
        }
    }

    /// Validate and submit. Registration never signs anyone in; the caller
    /// sends the user to the sign-in page afterwards.
    pub async fn register(&self, api: &ApiClient) -> AuthResult<Value> {
        self.validate()?;
        let body = api.post(self.endpoint(), None, &self.payload()).await?;
        info!(endpoint = self.endpoint(), "registration submitted");
        Ok(extract_record(body))
    }
}

fn invalid(message: &str) -> AuthError {
    AuthError::Validation(message.to_string())
}
