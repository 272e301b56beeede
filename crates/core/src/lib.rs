//! `brigade-core`: shared building blocks for the brigade coordination service.
//!
//! This crate is pure: no IO, no HTTP, no storage.

pub mod error;
pub mod geo;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use geo::{EARTH_RADIUS_KM, GeoPoint, haversine_km, path_length_km};
pub use id::{BrigadeId, InvitationId, RouteId, StationId, UserId};
