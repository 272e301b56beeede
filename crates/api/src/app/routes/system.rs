use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode};

use brigade_auth::MembershipStatus;
use brigade_domain::Member;
use brigade_infra::{BRIGADE_PARTITION, KeyFilter, TableQuery};

use crate::app::dto::{Items, MeResponse, MyBrigade};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::UserContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn me(Extension(user): Extension<UserContext>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id().to_string(),
        email: user.email().map(str::to_string),
        name: user.name().map(str::to_string),
    })
}

/// Brigades the caller belongs to (pending or active).
pub async fn my_brigades(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Items<MyBrigade>>, ApiError> {
    let memberships: Vec<Member> = services
        .members
        .list(&TableQuery::all().with_row_key(KeyFilter::Eq(user.user_id().to_string())))
        .await?;

    let mut items = Vec::new();
    for m in memberships.into_iter().filter(|m| m.status != MembershipStatus::Removed) {
        // Memberships of deleted brigades are skipped.
        if let Some(brigade) = services.brigades.get(BRIGADE_PARTITION, &m.brigade_id.to_string()).await? {
            items.push(MyBrigade {
                brigade,
                role: m.role,
                status: m.status,
            });
        }
    }
    Ok(Json(items.into()))
}
