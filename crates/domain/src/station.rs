use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brigade_core::{BrigadeId, DomainResult, GeoPoint, StationId, haversine_km};

use crate::validate;

/// A fixed place a brigade operates from (base, depot, water point).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub brigade_id: BrigadeId,
    pub id: StationId,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub location: GeoPoint,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStation {
    pub name: String,
    pub kind: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub address: Option<String>,
}

impl Station {
    pub fn create(brigade_id: BrigadeId, input: NewStation, now: DateTime<Utc>) -> DomainResult<Self> {
        let location = GeoPoint::new(input.lat, input.lon);
        location.validate()?;
        Ok(Self {
            brigade_id,
            id: StationId::new(),
            name: validate::required("name", &input.name, 120)?,
            kind: validate::optional("kind", input.kind.as_deref(), 40)?,
            location,
            address: validate::optional("address", input.address.as_deref(), 240)?,
            created_at: now,
        })
    }
}

/// Stations ordered by distance from `origin`, nearest first.
///
/// `max_km` drops anything farther away; `limit` caps the result length.
pub fn nearest_stations(
    stations: Vec<Station>,
    origin: GeoPoint,
    limit: usize,
    max_km: Option<f64>,
) -> Vec<(Station, f64)> {
    let mut ranked: Vec<(Station, f64)> = stations
        .into_iter()
        .map(|s| {
            let d = haversine_km(origin, s.location);
            (s, d)
        })
        .filter(|(_, d)| max_km.is_none_or(|max| *d <= max))
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(limit);
    ranked
}
