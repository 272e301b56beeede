use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};

use brigade_auth::{MembershipStatus, Permission, Role};
use brigade_domain::{Brigade, BrigadePatch, InvitationStatus, Member, NewBrigade};
use brigade_infra::{BRIGADE_PARTITION, TableQuery};

use crate::app::dto::{self, BrigadeListQuery, CreatedBrigade, Items};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/brigades", get(list_brigades).post(create_brigade))
        .route(
            "/brigades/:id",
            get(get_brigade).patch(update_brigade).delete(delete_brigade),
        )
        .route("/brigades/:id/claim", post(claim_brigade))
}

pub(crate) async fn load_brigade(services: &AppServices, id: &str) -> Result<Brigade, ApiError> {
    let brigade_id = dto::parse_brigade_id(id)?;
    services
        .brigades
        .get(BRIGADE_PARTITION, &brigade_id.to_string())
        .await?
        .ok_or_else(|| ApiError::not_found("brigade"))
}

pub async fn list_brigades(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<BrigadeListQuery>,
) -> Result<Json<Items<Brigade>>, ApiError> {
    let mut query = TableQuery::partition(BRIGADE_PARTITION);
    if let Some(region) = filter.region.filter(|r| !r.trim().is_empty()) {
        query = query.with_property("region", region.trim());
    }
    if let Some(verified) = filter.verified {
        query = query.with_property("verified", verified);
    }
    Ok(Json(services.brigades.list(&query).await?.into()))
}

pub async fn create_brigade(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Json(body): Json<NewBrigade>,
) -> Result<(StatusCode, Json<CreatedBrigade>), ApiError> {
    let now = Utc::now();
    let brigade = Brigade::create(body, Some(user.user_id().clone()), now)?;
    services.brigades.create(&brigade).await?;

    // A brigade must never exist without its founding admin.
    let membership = founding_admin(&brigade, &user, now);
    if let Err(e) = services.members.create(&membership).await {
        tracing::error!(brigade = %brigade.id, error = %e, "founding admin insert failed; rolling back brigade");
        if let Err(rollback) = services.brigades.delete(BRIGADE_PARTITION, &brigade.id.to_string()).await {
            tracing::error!(brigade = %brigade.id, error = %rollback, "brigade rollback failed");
        }
        return Err(e.into());
    }

    tracing::info!(brigade = %brigade.id, user = %user.user_id(), "brigade created");
    Ok((StatusCode::CREATED, Json(CreatedBrigade { brigade, membership })))
}

pub async fn get_brigade(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Brigade>, ApiError> {
    Ok(Json(load_brigade(&services, &id).await?))
}

pub async fn update_brigade(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<BrigadePatch>,
) -> Result<Json<Brigade>, ApiError> {
    let mut brigade = load_brigade(&services, &id).await?;
    authz::require(&services, &user, &brigade.id, Permission::EditSettings).await?;

    brigade.apply(body, Utc::now())?;
    services.brigades.update(&brigade).await?;
    Ok(Json(brigade))
}

pub async fn delete_brigade(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let brigade = load_brigade(&services, &id).await?;
    authz::require(&services, &user, &brigade.id, Permission::EditSettings).await?;

    // Revoke access before the row goes away, so a partial failure never
    // leaves live memberships on a missing brigade.
    let now = Utc::now();
    let partition = brigade.id.to_string();
    let mut cancelled = 0usize;
    for mut invitation in services.invitations.list_partition(&partition).await? {
        if invitation.status == InvitationStatus::Pending {
            invitation.cancel()?;
            services.invitations.update(&invitation).await?;
            cancelled += 1;
        }
    }
    let mut revoked = 0usize;
    for mut member in services.members.list_partition(&partition).await? {
        if member.status != MembershipStatus::Removed {
            member.remove(now)?;
            services.members.update(&member).await?;
            revoked += 1;
        }
    }

    services.brigades.delete(BRIGADE_PARTITION, &partition).await?;
    tracing::info!(brigade = %brigade.id, user = %user.user_id(), revoked, cancelled, "brigade deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Claim an imported (unclaimed) brigade; the claimant becomes its admin.
pub async fn claim_brigade(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<CreatedBrigade>, ApiError> {
    let now = Utc::now();
    let mut brigade = load_brigade(&services, &id).await?;
    brigade.claim(user.user_id(), now)?;
    services.brigades.update(&brigade).await?;

    let existing = services
        .members
        .get(&brigade.id.to_string(), user.user_id().as_str())
        .await?;
    let membership = match existing {
        Some(mut m) => {
            m.activate_with(Role::ADMIN, now);
            services.members.update(&m).await?;
            m
        }
        None => {
            let m = founding_admin(&brigade, &user, now);
            services.members.create(&m).await?;
            m
        }
    };

    tracing::info!(brigade = %brigade.id, user = %user.user_id(), "brigade claimed");
    Ok(Json(CreatedBrigade { brigade, membership }))
}

fn founding_admin(brigade: &Brigade, user: &UserContext, now: DateTime<Utc>) -> Member {
    Member::new(brigade.id, user.user_id().clone(), Role::ADMIN, MembershipStatus::Active, now)
        .with_profile(user.name().map(str::to_string), user.email().map(str::to_string))
}
