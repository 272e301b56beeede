use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::Utc;

use brigade_auth::{MembershipStatus, Permission, Role};
use brigade_core::{BrigadeId, InvitationId};
use brigade_domain::{Invitation, Member};
use brigade_infra::{BRIGADE_PARTITION, KeyFilter, TableQuery};

use crate::app::dto::{self, CreateInvitationRequest, Items};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route(
            "/brigades/:id/invitations",
            get(list_invitations).post(create_invitation),
        )
        .route("/brigades/:id/invitations/:invitation_id", delete(cancel_invitation))
        .route("/invitations/:invitation_id", get(get_invitation))
        .route("/invitations/:invitation_id/accept", post(accept_invitation))
}

fn parse_invitation_id(raw: &str) -> Result<InvitationId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("invalid invitation id".into()))
}

/// Look an invitation up by id alone (the brigade is not known to the invitee).
async fn find_invitation(services: &AppServices, id: &InvitationId) -> Result<Invitation, ApiError> {
    services
        .invitations
        .list(&TableQuery::all().with_row_key(KeyFilter::Eq(id.to_string())))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("invitation"))
}

pub async fn list_invitations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<Items<Invitation>>, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    authz::require(&services, &user, &brigade_id, Permission::InviteMembers).await?;
    Ok(Json(
        services
            .invitations
            .list_partition(&brigade_id.to_string())
            .await?
            .into(),
    ))
}

pub async fn create_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<Invitation>), ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    let role = match body.role.as_deref() {
        Some(r) => dto::parse_role(r)?,
        None => Role::VIEWER,
    };
    let caller = authz::require(&services, &user, &brigade_id, Permission::InviteMembers).await?;
    if role.is_admin() {
        authz::require_also(&caller, Permission::PromoteAdmin)?;
    }

    let invitation = Invitation::create(brigade_id, &body.email, role, user.user_id().clone(), Utc::now())?;
    services.invitations.create(&invitation).await?;
    tracing::info!(brigade = %brigade_id, invitation = %invitation.id, role = invitation.role.as_str(), "invitation created");
    Ok((StatusCode::CREATED, Json(invitation)))
}

pub async fn cancel_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((id, invitation_id)): Path<(String, String)>,
) -> Result<Json<Invitation>, ApiError> {
    let brigade_id: BrigadeId = dto::parse_brigade_id(&id)?;
    let invitation_id = parse_invitation_id(&invitation_id)?;
    authz::require(&services, &user, &brigade_id, Permission::CancelInvitation).await?;

    let mut invitation = services
        .invitations
        .get(&brigade_id.to_string(), &invitation_id.to_string())
        .await?
        .ok_or_else(|| ApiError::not_found("invitation"))?;
    invitation.cancel()?;
    services.invitations.update(&invitation).await?;
    Ok(Json(invitation))
}

pub async fn get_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    Path(invitation_id): Path<String>,
) -> Result<Json<Invitation>, ApiError> {
    let invitation_id = parse_invitation_id(&invitation_id)?;
    Ok(Json(find_invitation(&services, &invitation_id).await?))
}

/// Accept an invitation: the caller becomes an active member with the invited role.
pub async fn accept_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(invitation_id): Path<String>,
) -> Result<Json<Member>, ApiError> {
    let invitation_id = parse_invitation_id(&invitation_id)?;
    let mut invitation = find_invitation(&services, &invitation_id).await?;
    let now = Utc::now();

    let partition = invitation.brigade_id.to_string();
    if services.brigades.get(BRIGADE_PARTITION, &partition).await?.is_none() {
        return Err(ApiError::not_found("brigade"));
    }

    let existing = services.members.get(&partition, user.user_id().as_str()).await?;
    if existing.as_ref().is_some_and(|m| m.status == MembershipStatus::Active) {
        return Err(ApiError::Conflict("already a member of this brigade".into()));
    }

    // Validate before any write; the invitation is only marked accepted once
    // the membership is stored.
    invitation.accept(user.user_id(), user.email(), now)?;

    let member = match existing {
        Some(mut m) => {
            m.activate_with(invitation.role.clone(), now);
            m.invited_by = Some(invitation.created_by.clone());
            services.members.update(&m).await?;
            m
        }
        None => {
            let mut m = Member::new(
                invitation.brigade_id,
                user.user_id().clone(),
                invitation.role.clone(),
                MembershipStatus::Active,
                now,
            )
            .with_profile(user.name().map(str::to_string), user.email().map(str::to_string));
            m.invited_by = Some(invitation.created_by.clone());
            services.members.create(&m).await?;
            m
        }
    };
    services.invitations.update(&invitation).await?;

    tracing::info!(brigade = %invitation.brigade_id, invitation = %invitation.id, user = %user.user_id(), "invitation accepted");
    Ok(Json(member))
}
