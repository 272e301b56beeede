//! Request/response bodies that are not domain records themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brigade_auth::Role;
use brigade_core::{BrigadeId, RouteId};
use brigade_domain::{Brigade, Member, Station};
use brigade_infra::{ClientAccess, ClientScope};

use crate::app::errors::ApiError;

/// `{"items": [...]}` list envelope.
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for Items<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MyBrigade {
    pub brigade: Brigade,
    pub role: Role,
    pub status: brigade_auth::MembershipStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct BrigadeListQuery {
    pub region: Option<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CreatedBrigade {
    pub brigade: Brigade,
    pub membership: Member,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemberListQuery {
    #[serde(default)]
    pub include_removed: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub approved: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub lat: f64,
    pub lon: f64,
    pub limit: Option<usize>,
    pub max_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct NearbyStation {
    pub station: Station,
    pub distance_km: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct NegotiateRequest {
    #[serde(default)]
    pub scope: ClientScope,
}

impl NegotiateRequest {
    /// An empty body asks for the default scope; anything else must parse.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid negotiate request: {e}")))
    }
}

#[derive(Debug, Serialize)]
pub struct NegotiateResponse {
    pub group: String,
    pub scope: ClientScope,
    #[serde(flatten)]
    pub access: ClientAccess,
}

#[derive(Debug, Deserialize)]
pub struct LocationReport {
    pub lat: f64,
    pub lon: f64,
    pub heading: Option<f64>,
    pub speed_kmh: Option<f64>,
    pub route_id: Option<RouteId>,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Parse an assignable role name, rejecting anything outside admin/operator/viewer.
pub fn parse_role(name: &str) -> Result<Role, ApiError> {
    Role::parse_assignable(name).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "role must be one of: admin, operator, viewer (got '{}')",
            name.trim()
        ))
    })
}

pub fn parse_brigade_id(raw: &str) -> Result<BrigadeId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("invalid brigade id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_are_closed() {
        assert_eq!(parse_role(" Operator ").unwrap(), Role::OPERATOR);
        assert!(matches!(parse_role("owner"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn negotiate_defaults_to_viewer() {
        let req: NegotiateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.scope, ClientScope::Viewer);
        let req: NegotiateRequest = serde_json::from_str(r#"{"scope":"broadcaster"}"#).unwrap();
        assert_eq!(req.scope, ClientScope::Broadcaster);
    }

    #[test]
    fn negotiate_body_must_parse_when_present() {
        assert_eq!(NegotiateRequest::from_body(b"").unwrap().scope, ClientScope::Viewer);
        assert_eq!(NegotiateRequest::from_body(b" \n").unwrap().scope, ClientScope::Viewer);
        assert!(matches!(
            NegotiateRequest::from_body(br#"{"scope":"admin"}"#),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(NegotiateRequest::from_body(b"{not json"), Err(ApiError::BadRequest(_))));
    }
}
