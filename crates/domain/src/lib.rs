//! `brigade-domain`: entities of the brigade coordination service.
//!
//! Plain records plus their lifecycle rules. Persistence lives in
//! `brigade-infra`; authorization lives in `brigade-auth`.

pub mod brigade;
pub mod invitation;
pub mod location;
pub mod member;
pub mod route;
pub mod station;
pub mod validate;
pub mod verification;

pub use brigade::{Brigade, BrigadePatch, NewBrigade};
pub use invitation::{INVITATION_TTL_DAYS, Invitation, InvitationStatus};
pub use location::LocationUpdate;
pub use member::{Member, active_admin_count};
pub use route::{NewRoute, Route, RoutePatch, Waypoint};
pub use station::{NewStation, Station, nearest_stations};
pub use verification::{Verification, VerificationRequest, VerificationStatus};
