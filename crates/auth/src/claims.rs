use serde::{Deserialize, Serialize};

use brigade_core::UserId;

/// Claims read from a verified identity-provider access token.
///
/// Only the claims this service consumes are modeled; everything else in the
/// token is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Object id of the user in the directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    /// Directory tenant id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl IdentityClaims {
    /// Canonical user key: `oid` (or `sub`) joined with `tid` when present.
    pub fn user_id(&self) -> Option<UserId> {
        let object_id = non_empty(self.oid.as_deref()).or(non_empty(self.sub.as_deref()))?;
        Some(UserId::composite(object_id, non_empty(self.tid.as_deref())))
    }

    pub fn email(&self) -> Option<String> {
        non_empty(self.email.as_deref())
            .or(non_empty(self.preferred_username.as_deref()))
            .map(str::to_string)
    }

    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = non_empty(self.name.as_deref()) {
            return Some(name.to_string());
        }
        let parts: Vec<&str> = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .filter_map(non_empty)
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl AuthenticatedUser {
    /// Fixed identity returned while the development bypass is on.
    pub fn dev_mock() -> Self {
        Self {
            user_id: UserId::composite("dev-user", Some("dev-tenant")),
            email: Some("dev@localhost".to_string()),
            name: Some("Local Developer".to_string()),
        }
    }

    pub fn from_claims(claims: &IdentityClaims) -> Option<Self> {
        Some(Self {
            user_id: claims.user_id()?,
            email: claims.email(),
            name: claims.display_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> IdentityClaims {
        IdentityClaims {
            iss: "https://login.microsoftonline.com/tid1/v2.0".to_string(),
            sub: Some("pairwise-sub".to_string()),
            oid: Some("abc".to_string()),
            tid: Some("tid1".to_string()),
            exp: 0,
            ..Default::default()
        }
    }

    #[test]
    fn user_id_is_oid_dot_tid() {
        assert_eq!(claims().user_id().unwrap().as_str(), "abc.tid1");
    }

    #[test]
    fn user_id_without_tenant_is_oid() {
        let c = IdentityClaims { tid: None, ..claims() };
        assert_eq!(c.user_id().unwrap().as_str(), "abc");
    }

    #[test]
    fn user_id_falls_back_to_subject() {
        let c = IdentityClaims { oid: None, ..claims() };
        assert_eq!(c.user_id().unwrap().as_str(), "pairwise-sub.tid1");

        let c = IdentityClaims { oid: None, sub: None, ..claims() };
        assert!(c.user_id().is_none());
    }

    #[test]
    fn email_falls_back_to_preferred_username() {
        let c = IdentityClaims {
            preferred_username: Some("ana@brigade.org".to_string()),
            ..claims()
        };
        assert_eq!(c.email().as_deref(), Some("ana@brigade.org"));

        let c = IdentityClaims {
            email: Some("direct@brigade.org".to_string()),
            preferred_username: Some("ana@brigade.org".to_string()),
            ..claims()
        };
        assert_eq!(c.email().as_deref(), Some("direct@brigade.org"));
    }

    #[test]
    fn name_falls_back_to_given_and_family() {
        let c = IdentityClaims {
            given_name: Some("Ana".to_string()),
            family_name: Some("Rojas".to_string()),
            ..claims()
        };
        assert_eq!(c.display_name().as_deref(), Some("Ana Rojas"));

        let c = IdentityClaims {
            given_name: Some("Ana".to_string()),
            ..claims()
        };
        assert_eq!(c.display_name().as_deref(), Some("Ana"));
        assert_eq!(claims().display_name(), None);
    }
}
