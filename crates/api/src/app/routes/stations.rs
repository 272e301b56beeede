use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{delete, get},
};
use chrono::Utc;

use brigade_auth::Permission;
use brigade_core::{BrigadeId, GeoPoint, StationId};
use brigade_domain::{NewStation, Station, nearest_stations};
use brigade_infra::{BRIGADE_PARTITION, StoreError, TableQuery};

use crate::app::dto::{self, Items, NearbyStation, NearestQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::UserContext;

const DEFAULT_NEAREST: usize = 10;
const MAX_NEAREST: usize = 100;

pub fn router() -> Router {
    Router::new()
        .route("/brigades/:id/stations", get(list_stations).post(create_station))
        .route("/brigades/:id/stations/:station_id", delete(delete_station))
        .route("/stations/nearest", get(nearest))
}

pub async fn list_stations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<Items<Station>>, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    authz::require(&services, &user, &brigade_id, Permission::ViewMembers).await?;
    Ok(Json(services.stations.list_partition(&brigade_id.to_string()).await?.into()))
}

pub async fn create_station(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<NewStation>,
) -> Result<(StatusCode, Json<Station>), ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    authz::require(&services, &user, &brigade_id, Permission::EditSettings).await?;

    let station = Station::create(brigade_id, body, Utc::now())?;
    services.stations.create(&station).await?;
    Ok((StatusCode::CREATED, Json(station)))
}

pub async fn delete_station(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((id, station_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let brigade_id = dto::parse_brigade_id(&id)?;
    let station_id: StationId = station_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid station id".into()))?;
    authz::require(&services, &user, &brigade_id, Permission::EditSettings).await?;

    services
        .stations
        .delete(&brigade_id.to_string(), &station_id.to_string())
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("station"),
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stations of every brigade, nearest to `(lat, lon)` first.
pub async fn nearest(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<NearestQuery>,
) -> Result<Json<Items<NearbyStation>>, ApiError> {
    let origin = GeoPoint::new(q.lat, q.lon);
    origin.validate()?;
    if q.max_km.is_some_and(|m| !m.is_finite() || m < 0.0) {
        return Err(ApiError::BadRequest("max_km must be a non-negative number".into()));
    }
    let limit = q.limit.unwrap_or(DEFAULT_NEAREST).clamp(1, MAX_NEAREST);

    // Stations of deleted brigades stay in their partition; skip them.
    let live: HashSet<BrigadeId> = services
        .brigades
        .list_partition(BRIGADE_PARTITION)
        .await?
        .into_iter()
        .map(|b| b.id)
        .collect();
    let stations = services
        .stations
        .list(&TableQuery::all())
        .await?
        .into_iter()
        .filter(|s| live.contains(&s.brigade_id))
        .collect();
    let items = nearest_stations(stations, origin, limit, q.max_km)
        .into_iter()
        .map(|(station, distance_km)| NearbyStation { station, distance_km })
        .collect::<Vec<_>>();
    Ok(Json(items.into()))
}
