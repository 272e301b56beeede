//! Strongly-typed identifiers used across the service.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a brigade (the resource every membership is scoped to).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrigadeId(Uuid);

/// Identifier of a navigation route within a brigade.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(Uuid);

/// Identifier of an invitation (also used as the shareable invitation code).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationId(Uuid);

/// Identifier of a station (base, depot, water point) owned by a brigade.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier (UUIDv7, time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(BrigadeId, "BrigadeId");
impl_uuid_newtype!(RouteId, "RouteId");
impl_uuid_newtype!(InvitationId, "InvitationId");
impl_uuid_newtype!(StationId, "StationId");

/// Canonical user identity key.
///
/// Derived from the identity provider's object id and tenant id as
/// `"<oid>.<tid>"` (or `"<oid>"` when the token carries no tenant). Membership
/// rows are keyed by this value, so the derivation must never change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Derive the composite identity key from object id and optional tenant id.
    pub fn composite(object_id: &str, tenant_id: Option<&str>) -> Self {
        match tenant_id.filter(|t| !t.is_empty()) {
            Some(tid) => Self(format!("{object_id}.{tid}")),
            None => Self(object_id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DomainError::invalid_id("UserId: empty"));
        }
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_id_joins_object_and_tenant() {
        assert_eq!(UserId::composite("abc", Some("tid1")).as_str(), "abc.tid1");
    }

    #[test]
    fn composite_id_without_tenant_is_object_id() {
        assert_eq!(UserId::composite("abc", None).as_str(), "abc");
        assert_eq!(UserId::composite("abc", Some("")).as_str(), "abc");
    }

    #[test]
    fn uuid_ids_round_trip_through_strings() {
        let id = BrigadeId::new();
        let parsed: BrigadeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn invalid_uuid_is_rejected_with_type_name() {
        let err = "not-a-uuid".parse::<RouteId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(msg) if msg.starts_with("RouteId")));
    }

    #[test]
    fn empty_user_id_is_rejected() {
        assert!("  ".parse::<UserId>().is_err());
    }
}
