use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role held by a member within a brigade.
///
/// Stored as an opaque string so that rows written with a role this build
/// does not know still load; such roles simply grant nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const OPERATOR: Role = Role(Cow::Borrowed("operator"));
    pub const VIEWER: Role = Role(Cow::Borrowed("viewer"));

    /// Roles that may be assigned through the API.
    pub const ASSIGNABLE: [Role; 3] = [Role::ADMIN, Role::OPERATOR, Role::VIEWER];

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Parse a role supplied by a client, accepting only assignable roles.
    pub fn parse_assignable(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ASSIGNABLE.into_iter().find(|r| r.as_str() == name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == "admin"
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_assignable_is_case_insensitive() {
        assert_eq!(Role::parse_assignable(" Operator "), Some(Role::OPERATOR));
        assert_eq!(Role::parse_assignable("owner"), None);
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Role::VIEWER).unwrap();
        assert_eq!(json, "\"viewer\"");
        let back: Role = serde_json::from_str("\"legacy\"").unwrap();
        assert_eq!(back.as_str(), "legacy");
    }
}
