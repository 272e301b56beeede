use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

use brigade_auth::Permission;
use brigade_domain::{Verification, VerificationRequest, VerificationStatus};
use brigade_infra::VERIFICATION_ROW;

use crate::app::dto::{self, ReviewRequest};
use crate::app::errors::ApiError;
use crate::app::routes::brigades::load_brigade;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route(
            "/brigades/:id/verification",
            get(get_verification).post(submit_verification),
        )
        .route("/brigades/:id/verification/review", post(review_verification))
}

pub async fn get_verification(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<Verification>, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    authz::require(&services, &user, &brigade_id, Permission::ViewMembers).await?;
    services
        .verifications
        .get(&brigade_id.to_string(), VERIFICATION_ROW)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("verification request"))
}

/// Submit, or resubmit after a rejection.
pub async fn submit_verification(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<VerificationRequest>,
) -> Result<(StatusCode, Json<Verification>), ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    authz::require(&services, &user, &brigade_id, Permission::EditSettings).await?;

    let previous = services
        .verifications
        .get(&brigade_id.to_string(), VERIFICATION_ROW)
        .await?;
    let request = Verification::submit(brigade_id, body, previous.as_ref(), user.user_id().clone(), Utc::now())?;

    let status = if previous.is_some() {
        services.verifications.update(&request).await?;
        StatusCode::OK
    } else {
        services.verifications.create(&request).await?;
        StatusCode::CREATED
    };
    tracing::info!(brigade = %brigade_id, user = %user.user_id(), "verification submitted");
    Ok((status, Json(request)))
}

pub async fn review_verification(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<Verification>, ApiError> {
    if !services.is_reviewer(user.user_id()) {
        tracing::debug!(user = %user.user_id(), "verification review denied");
        return Err(ApiError::Forbidden("not a verification reviewer".into()));
    }

    let mut brigade = load_brigade(&services, &id).await?;
    let mut request = services
        .verifications
        .get(&brigade.id.to_string(), VERIFICATION_ROW)
        .await?
        .ok_or_else(|| ApiError::not_found("verification request"))?;

    let now = Utc::now();
    request.review(body.approved, user.user_id().clone(), body.notes, now)?;
    services.verifications.update(&request).await?;

    if request.status == VerificationStatus::Approved {
        brigade.verified = true;
        brigade.updated_at = now;
        services.brigades.update(&brigade).await?;
    }
    tracing::info!(brigade = %brigade.id, approved = body.approved, reviewer = %user.user_id(), "verification reviewed");
    Ok(Json(request))
}
