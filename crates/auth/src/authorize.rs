use thiserror::Error;

use brigade_core::{BrigadeId, UserId};

use crate::{Membership, MembershipLookup, MembershipStatus, Permission, Role, role_has_permission};

/// Reason a permission check was denied.
///
/// Every variant is an authorization outcome (HTTP 403), including a failed
/// lookup: a broken membership source must never look like a transient
/// infrastructure error to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user is not a member of this brigade")]
    NotAMember,

    #[error("membership is not active (status: {0})")]
    NotActive(MembershipStatus),

    #[error("role '{role}' does not have permission '{permission}'")]
    MissingPermission { role: Role, permission: Permission },

    #[error("permission check failed: {0}")]
    LookupFailed(String),
}

/// Check that `user_id` holds `required` in `brigade_id`.
///
/// - No panics
/// - No storage knowledge (membership comes from `lookup`)
/// - Returns the membership on success so callers can reuse it
pub async fn check_permission<L>(
    user_id: &UserId,
    brigade_id: &BrigadeId,
    required: Permission,
    lookup: &L,
) -> Result<Membership, AuthzError>
where
    L: MembershipLookup + ?Sized,
{
    let membership = match lookup.find_membership(user_id, brigade_id).await {
        Ok(Some(m)) => m,
        Ok(None) => return Err(AuthzError::NotAMember),
        Err(e) => {
            tracing::warn!(%user_id, %brigade_id, error = %e, "membership lookup failed");
            return Err(AuthzError::LookupFailed(e.to_string()));
        }
    };

    if membership.status != MembershipStatus::Active {
        return Err(AuthzError::NotActive(membership.status));
    }

    if !role_has_permission(membership.role.as_str(), required) {
        return Err(AuthzError::MissingPermission {
            role: membership.role.clone(),
            permission: required,
        });
    }

    Ok(membership)
}
