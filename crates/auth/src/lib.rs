//! `brigade-auth`: authentication and authorization boundary.
//!
//! Decoupled from HTTP routing and storage: the token validator only needs a
//! key source, and the permission evaluator only needs a membership lookup.

pub mod authorize;
pub mod claims;
pub mod jwks;
pub mod membership;
pub mod permissions;
pub mod roles;
pub mod validator;

pub use authorize::{AuthzError, check_permission};
pub use claims::{AuthenticatedUser, IdentityClaims};
pub use jwks::{HttpKeySource, JwksCache, KeySetError, KeySource, StaticKeySource};
pub use membership::{Membership, MembershipLookup, MembershipStatus};
pub use permissions::{Permission, permissions_for_role, role_has_permission};
pub use roles::Role;
pub use validator::{AuthError, TokenValidator, ValidatorConfig, extract_bearer};
