//! Navigation routes of a brigade.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

use brigade_auth::Permission;
use brigade_core::{BrigadeId, RouteId};
use brigade_domain::{NewRoute, Route, RoutePatch};

use crate::app::dto::{self, Items};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/brigades/:id/routes", get(list_routes).post(create_route))
        .route(
            "/brigades/:id/routes/:route_id",
            get(get_route).patch(update_route).delete(delete_route),
        )
}

fn parse_ids(brigade: &str, route: &str) -> Result<(BrigadeId, RouteId), ApiError> {
    let route_id = route
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid route id".into()))?;
    Ok((dto::parse_brigade_id(brigade)?, route_id))
}

async fn load_route(services: &AppServices, brigade_id: &BrigadeId, route_id: &RouteId) -> Result<Route, ApiError> {
    services
        .routes
        .get(&brigade_id.to_string(), &route_id.to_string())
        .await?
        .ok_or_else(|| ApiError::not_found("route"))
}

pub async fn list_routes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<Items<Route>>, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    authz::require(&services, &user, &brigade_id, Permission::ViewMembers).await?;
    Ok(Json(services.routes.list_partition(&brigade_id.to_string()).await?.into()))
}

pub async fn create_route(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<NewRoute>,
) -> Result<(StatusCode, Json<Route>), ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    authz::require(&services, &user, &brigade_id, Permission::ManageRoutes).await?;

    let route = Route::create(brigade_id, body, user.user_id().clone(), Utc::now())?;
    services.routes.create(&route).await?;
    tracing::info!(brigade = %brigade_id, route = %route.id, distance_km = route.distance_km, "route created");
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn get_route(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((id, route_id)): Path<(String, String)>,
) -> Result<Json<Route>, ApiError> {
    let (brigade_id, route_id) = parse_ids(&id, &route_id)?;
    authz::require(&services, &user, &brigade_id, Permission::ViewMembers).await?;
    Ok(Json(load_route(&services, &brigade_id, &route_id).await?))
}

pub async fn update_route(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((id, route_id)): Path<(String, String)>,
    Json(body): Json<RoutePatch>,
) -> Result<Json<Route>, ApiError> {
    let (brigade_id, route_id) = parse_ids(&id, &route_id)?;
    authz::require(&services, &user, &brigade_id, Permission::ManageRoutes).await?;

    let mut route = load_route(&services, &brigade_id, &route_id).await?;
    route.apply(body, Utc::now())?;
    services.routes.update(&route).await?;
    Ok(Json(route))
}

pub async fn delete_route(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((id, route_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let (brigade_id, route_id) = parse_ids(&id, &route_id)?;
    authz::require(&services, &user, &brigade_id, Permission::ManageRoutes).await?;

    services
        .routes
        .delete(&brigade_id.to_string(), &route_id.to_string())
        .await
        .map_err(|e| match e {
            brigade_infra::StoreError::NotFound => ApiError::not_found("route"),
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}
