pub mod credential;
pub mod error;
pub mod guards;
pub mod principal;
pub mod roles;

pub use credential::Credential;
pub use error::{AuthError, AuthResult, ErrorKind};
pub use guards::ensure_role;
pub use principal::{Principal, TenantScope};
pub use roles::{
    Role, ROLE_FRONTDESK, ROLE_MANAGER, ROLE_MEMBER, ROLE_OWNER, ROLE_SUPER_ADMIN, ROLE_TRAINER,
};
