use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brigade_core::geo::path_length_km;
use brigade_core::{BrigadeId, DomainError, DomainResult, GeoPoint, RouteId, UserId};

use crate::validate;

const MAX_WAYPOINTS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Waypoint {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// A navigation route planned by a brigade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub brigade_id: BrigadeId,
    pub id: RouteId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub waypoints: Vec<Waypoint>,
    pub distance_km: f64,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoute {
    pub name: String,
    pub description: Option<String>,
    pub waypoints: Vec<Waypoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub waypoints: Option<Vec<Waypoint>>,
}

fn check_waypoints(waypoints: &[Waypoint]) -> DomainResult<()> {
    if waypoints.len() < 2 {
        return Err(DomainError::validation("a route needs at least two waypoints"));
    }
    if waypoints.len() > MAX_WAYPOINTS {
        return Err(DomainError::validation(format!(
            "a route can have at most {MAX_WAYPOINTS} waypoints"
        )));
    }
    for (i, wp) in waypoints.iter().enumerate() {
        wp.point()
            .validate()
            .map_err(|e| DomainError::validation(format!("waypoint {i}: {e}")))?;
    }
    Ok(())
}

fn distance(waypoints: &[Waypoint]) -> f64 {
    let points: Vec<GeoPoint> = waypoints.iter().map(Waypoint::point).collect();
    path_length_km(&points)
}

impl Route {
    pub fn create(
        brigade_id: BrigadeId,
        input: NewRoute,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        check_waypoints(&input.waypoints)?;
        Ok(Self {
            brigade_id,
            id: RouteId::new(),
            name: validate::required("name", &input.name, 120)?,
            description: validate::optional("description", input.description.as_deref(), 2000)?,
            distance_km: distance(&input.waypoints),
            waypoints: input.waypoints,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: RoutePatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            self.name = validate::required("name", &name, 120)?;
        }
        if let Some(description) = patch.description {
            self.description = validate::optional("description", Some(&description), 2000)?;
        }
        if let Some(waypoints) = patch.waypoints {
            check_waypoints(&waypoints)?;
            self.distance_km = distance(&waypoints);
            self.waypoints = waypoints;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(lat: f64, lon: f64) -> Waypoint {
        Waypoint { lat, lon, label: None }
    }

    fn user() -> UserId {
        UserId::composite("ana", Some("t"))
    }

    #[test]
    fn distance_is_computed_from_waypoints() {
        let r = Route::create(
            BrigadeId::new(),
            NewRoute {
                name: "Patrol".into(),
                description: None,
                waypoints: vec![wp(0.0, 0.0), wp(0.0, 1.0)],
            },
            user(),
            Utc::now(),
        )
        .unwrap();
        assert!((r.distance_km - 111.19).abs() < 0.1, "{}", r.distance_km);
    }

    #[test]
    fn single_waypoint_or_bad_coordinates_are_rejected() {
        let one = NewRoute { name: "x".into(), description: None, waypoints: vec![wp(0.0, 0.0)] };
        assert!(Route::create(BrigadeId::new(), one, user(), Utc::now()).is_err());

        let bad = NewRoute {
            name: "x".into(),
            description: None,
            waypoints: vec![wp(0.0, 0.0), wp(100.0, 0.0)],
        };
        let err = Route::create(BrigadeId::new(), bad, user(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("waypoint 1"));
    }

    #[test]
    fn patching_waypoints_recomputes_distance() {
        let mut r = Route::create(
            BrigadeId::new(),
            NewRoute { name: "x".into(), description: None, waypoints: vec![wp(0.0, 0.0), wp(0.0, 1.0)] },
            user(),
            Utc::now(),
        )
        .unwrap();
        let before = r.distance_km;
        r.apply(
            RoutePatch { waypoints: Some(vec![wp(0.0, 0.0), wp(0.0, 2.0)]), ..Default::default() },
            Utc::now(),
        )
        .unwrap();
        assert!(r.distance_km > before * 1.9);
    }
}
