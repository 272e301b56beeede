//! Brigade membership management.
//!
//! Removal is a status change, the row is kept. A brigade always keeps at
//! least one active admin.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::Utc;

use brigade_auth::{MembershipStatus, Permission, Role};
use brigade_core::{BrigadeId, UserId};
use brigade_domain::{Member, active_admin_count};

use crate::app::dto::{self, Items, MemberListQuery, UpdateMemberRequest};
use crate::app::errors::ApiError;
use crate::app::routes::brigades::load_brigade;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/brigades/:id/members", get(list_members))
        .route("/brigades/:id/members/join", post(join_brigade))
        .route(
            "/brigades/:id/members/:user_id",
            patch(update_member).delete(remove_member),
        )
        .route("/brigades/:id/members/:user_id/approve", post(approve_member))
}

fn parse_user(raw: &str) -> Result<UserId, ApiError> {
    raw.parse().map_err(|_| ApiError::BadRequest("invalid user id".into()))
}

async fn load_member(services: &AppServices, brigade_id: &BrigadeId, user_id: &UserId) -> Result<Member, ApiError> {
    services
        .members
        .get(&brigade_id.to_string(), user_id.as_str())
        .await?
        .ok_or_else(|| ApiError::not_found("member"))
}

/// Refuse a change that would leave the brigade without an active admin.
async fn ensure_admin_remains(services: &AppServices, target: &Member) -> Result<(), ApiError> {
    if !target.is_active_admin() {
        return Ok(());
    }
    let members = services.members.list_partition(&target.brigade_id.to_string()).await?;
    if active_admin_count(&members) <= 1 {
        return Err(ApiError::Conflict("a brigade must keep at least one active admin".into()));
    }
    Ok(())
}

pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Query(filter): Query<MemberListQuery>,
) -> Result<Json<Items<Member>>, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    authz::require(&services, &user, &brigade_id, Permission::ViewMembers).await?;

    let members = services
        .members
        .list_partition(&brigade_id.to_string())
        .await?
        .into_iter()
        .filter(|m| filter.include_removed || m.status != MembershipStatus::Removed)
        .collect::<Vec<_>>();
    Ok(Json(members.into()))
}

/// Ask to join a brigade. The request waits for approval as a viewer.
pub async fn join_brigade(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    let brigade = load_brigade(&services, &id).await?;
    let now = Utc::now();

    let existing = services
        .members
        .get(&brigade.id.to_string(), user.user_id().as_str())
        .await?;
    let member = match existing {
        Some(mut m) => {
            m.request_rejoin(now)?;
            services.members.update(&m).await?;
            m
        }
        None => {
            let m = Member::new(brigade.id, user.user_id().clone(), Role::VIEWER, MembershipStatus::Pending, now)
                .with_profile(user.name().map(str::to_string), user.email().map(str::to_string));
            services.members.create(&m).await?;
            m
        }
    };

    tracing::info!(brigade = %brigade.id, user = %user.user_id(), "join requested");
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn approve_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((id, target)): Path<(String, String)>,
) -> Result<Json<Member>, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    let target = parse_user(&target)?;
    authz::require(&services, &user, &brigade_id, Permission::ApproveMembers).await?;

    let mut member = load_member(&services, &brigade_id, &target).await?;
    member.approve(Utc::now())?;
    services.members.update(&member).await?;
    tracing::info!(brigade = %brigade_id, member = %target, by = %user.user_id(), "member approved");
    Ok(Json(member))
}

pub async fn update_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((id, target)): Path<(String, String)>,
    Json(body): Json<UpdateMemberRequest>,
) -> Result<Json<Member>, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    let target = parse_user(&target)?;
    let role = dto::parse_role(&body.role)?;
    let caller = authz::require(&services, &user, &brigade_id, Permission::ManageMembers).await?;

    let mut member = load_member(&services, &brigade_id, &target).await?;
    if role.is_admin() && !member.role.is_admin() {
        authz::require_also(&caller, Permission::PromoteAdmin)?;
    }
    if member.role.is_admin() && !role.is_admin() {
        authz::require_also(&caller, Permission::DemoteAdmin)?;
        ensure_admin_remains(&services, &member).await?;
    }

    member.change_role(role, Utc::now())?;
    services.members.update(&member).await?;
    tracing::info!(brigade = %brigade_id, member = %target, role = %member.role.as_str(), by = %user.user_id(), "member role changed");
    Ok(Json(member))
}

pub async fn remove_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((id, target)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    let target = parse_user(&target)?;

    // Leaving a brigade needs no permission.
    let caller = if &target == user.user_id() {
        None
    } else {
        Some(authz::require(&services, &user, &brigade_id, Permission::RemoveMembers).await?)
    };

    let mut member = load_member(&services, &brigade_id, &target).await?;
    if let Some(caller) = &caller {
        if member.role.is_admin() {
            authz::require_also(caller, Permission::DemoteAdmin)?;
        }
    }
    ensure_admin_remains(&services, &member).await?;
    member.remove(Utc::now())?;
    services.members.update(&member).await?;
    tracing::info!(brigade = %brigade_id, member = %target, by = %user.user_id(), "member removed");
    Ok(StatusCode::NO_CONTENT)
}
