use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brigade_core::{BrigadeId, DomainError, DomainResult, GeoPoint, RouteId, UserId};

/// A live position report relayed to everyone watching a brigade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub brigade_id: BrigadeId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Degrees clockwise from north, `[0, 360)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<RouteId>,
    pub recorded_at: DateTime<Utc>,
}

impl LocationUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        GeoPoint::new(self.lat, self.lon).validate()?;
        if let Some(h) = self.heading {
            if !h.is_finite() || !(0.0..360.0).contains(&h) {
                return Err(DomainError::validation("heading must be within [0, 360)"));
            }
        }
        if let Some(s) = self.speed_kmh {
            if !s.is_finite() || s < 0.0 {
                return Err(DomainError::validation("speed_kmh must be a non-negative number"));
            }
        }
        Ok(())
    }

    /// Pub/sub group carrying a brigade's live positions.
    pub fn group_for(brigade_id: &BrigadeId) -> String {
        format!("brigade-{brigade_id}")
    }
}
