//! API-side permission guard.
//!
//! Every brigade-scoped mutation goes through [`require`] before touching
//! storage. Denials are returned as `403` and logged at debug.

use brigade_auth::{AuthzError, Membership, Permission, check_permission, role_has_permission};
use brigade_core::BrigadeId;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::UserContext;

/// Check that the caller holds `permission` in `brigade_id`.
pub async fn require(
    services: &AppServices,
    user: &UserContext,
    brigade_id: &BrigadeId,
    permission: Permission,
) -> Result<Membership, ApiError> {
    check_permission(user.user_id(), brigade_id, permission, &services.lookup)
        .await
        .map_err(|e| deny(user, brigade_id, permission, e))
}

/// Additional permission check against a membership already granted.
pub fn require_also(membership: &Membership, permission: Permission) -> Result<(), ApiError> {
    if role_has_permission(membership.role.as_str(), permission) {
        return Ok(());
    }
    let err = AuthzError::MissingPermission {
        role: membership.role.clone(),
        permission,
    };
    tracing::debug!(user = %membership.user_id, brigade = %membership.brigade_id, %permission, "permission denied");
    Err(ApiError::Forbidden(err.to_string()))
}

fn deny(user: &UserContext, brigade_id: &BrigadeId, permission: Permission, err: AuthzError) -> ApiError {
    match &err {
        AuthzError::LookupFailed(_) => {
            tracing::warn!(user = %user.user_id(), brigade = %brigade_id, %permission, error = %err, "permission lookup failed");
        }
        _ => {
            tracing::debug!(user = %user.user_id(), brigade = %brigade_id, %permission, reason = %err, "permission denied");
        }
    }
    ApiError::Forbidden(err.to_string())
}
