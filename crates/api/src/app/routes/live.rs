//! Live location relay.
//!
//! Positions are validated and handed to the broadcaster as-is. Clients
//! connect to the pub/sub service directly with the access returned by
//! `negotiate`.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    routing::post,
};
use chrono::Utc;
use serde_json::json;

use brigade_auth::Permission;
use brigade_domain::LocationUpdate;
use brigade_infra::ClientScope;

use crate::app::dto::{self, LocationReport, NegotiateRequest, NegotiateResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/brigades/:id/live/negotiate", post(negotiate))
        .route("/brigades/:id/live/locations", post(publish_location))
}

pub async fn negotiate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<NegotiateResponse>, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    let scope = NegotiateRequest::from_body(&body)?.scope;
    let required = match scope {
        ClientScope::Viewer => Permission::ViewMembers,
        ClientScope::Broadcaster => Permission::StartNavigation,
    };
    authz::require(&services, &user, &brigade_id, required).await?;

    let group = LocationUpdate::group_for(&brigade_id);
    let access = services
        .broadcaster
        .client_access(user.user_id(), &group, scope)
        .await?;
    tracing::debug!(brigade = %brigade_id, user = %user.user_id(), scope = scope.as_str(), "live access issued");
    Ok(Json(NegotiateResponse { group, scope, access }))
}

pub async fn publish_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<LocationReport>,
) -> Result<(StatusCode, Json<LocationUpdate>), ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    authz::require(&services, &user, &brigade_id, Permission::StartNavigation).await?;

    let update = LocationUpdate {
        brigade_id,
        user_id: user.user_id().clone(),
        display_name: user.name().map(str::to_string),
        lat: body.lat,
        lon: body.lon,
        heading: body.heading,
        speed_kmh: body.speed_kmh,
        route_id: body.route_id,
        recorded_at: body.recorded_at.unwrap_or_else(Utc::now),
    };
    update.validate()?;

    let group = LocationUpdate::group_for(&brigade_id);
    services
        .broadcaster
        .send_to_group(&group, &json!({ "type": "location", "data": update }))
        .await?;
    Ok((StatusCode::ACCEPTED, Json(update)))
}
