use tracing::warn;

use crate::error::{AuthError, AuthResult};
use crate::principal::Principal;
use crate::roles::Role;

/// Allow the principal through only if its role is in `allowed`.
///
/// An empty allow-list is a configuration defect and denies everyone, and an
/// unrecognised role never matches.
pub fn ensure_role(principal: &Principal, allowed: &[Role]) -> AuthResult<()> {
    let permitted = principal.role.is_known() && allowed.iter().any(|role| *role == principal.role);

    if permitted {
        return Ok(());
    }

    if allowed.is_empty() {
        warn!(principal_id = %principal.id, "empty role allow-list denies access");
    } else {
        warn!(
            principal_id = %principal.id,
            role = %principal.role,
            required = ?allowed,
            "role_check_failed"
        );
    }

    Err(AuthError::Forbidden {
        role: principal.role.clone(),
        required: allowed.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::TenantScope;

    fn principal(role: Role) -> Principal {
        Principal {
            id: "u-1".into(),
            name: "Test".into(),
            email: "test@gym.test".into(),
            role,
            tenant: TenantScope::Tenant("t-1".into()),
        }
    }

    #[test]
    fn member_is_denied_admin_roles() {
        let err = ensure_role(&principal(Role::Member), &[Role::SuperAdmin, Role::Owner])
            .expect_err("member must be denied");
        match err {
            AuthError::Forbidden { role, required } => {
                assert_eq!(role, Role::Member);
                assert_eq!(required, vec![Role::SuperAdmin, Role::Owner]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn listed_role_is_allowed() {
        ensure_role(&principal(Role::Frontdesk), &[Role::Owner, Role::Frontdesk])
            .expect("frontdesk allowed");
    }

    #[test]
    fn empty_allow_list_fails_closed() {
        for role in Role::KNOWN {
            assert!(ensure_role(&principal(role), &[]).is_err());
        }
    }

    #[test]
    fn unknown_role_never_matches() {
        let odd = Role::Unknown("Owner".into());
        let allowed = vec![Role::Owner, Role::Unknown("Owner".into())];
        assert!(ensure_role(&principal(odd), &allowed).is_err());
    }
}
