use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brigade_core::{BrigadeId, DomainError, DomainResult, UserId};

use crate::validate;

/// A volunteer brigade.
///
/// Brigades imported from a directory start unclaimed (`claimed_by == None`);
/// the first user to claim one becomes its admin. Brigades created through the
/// API are claimed by their creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brigade {
    pub id: BrigadeId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub claimed_by: Option<UserId>,
    #[serde(default)]
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or importing a brigade.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBrigade {
    pub name: String,
    pub description: Option<String>,
    pub region: Option<String>,
    pub contact_email: Option<String>,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrigadePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub contact_email: Option<String>,
}

impl Brigade {
    pub fn create(input: NewBrigade, owner: Option<UserId>, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: BrigadeId::new(),
            name: validate::required("name", &input.name, 120)?,
            description: validate::optional("description", input.description.as_deref(), 2000)?,
            region: validate::optional("region", input.region.as_deref(), 120)?,
            contact_email: input
                .contact_email
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .map(|e| validate::email("contact_email", e))
                .transpose()?,
            claimed_by: owner,
            verified: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }

    pub fn claim(&mut self, user: &UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(owner) = &self.claimed_by {
            return Err(DomainError::conflict(if owner == user {
                "brigade is already claimed by you"
            } else {
                "brigade has already been claimed"
            }));
        }
        self.claimed_by = Some(user.clone());
        self.updated_at = now;
        Ok(())
    }

    pub fn apply(&mut self, patch: BrigadePatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            self.name = validate::required("name", &name, 120)?;
        }
        if let Some(description) = patch.description {
            self.description = validate::optional("description", Some(&description), 2000)?;
        }
        if let Some(region) = patch.region {
            self.region = validate::optional("region", Some(&region), 120)?;
        }
        if let Some(contact) = patch.contact_email {
            self.contact_email = if contact.trim().is_empty() {
                None
            } else {
                Some(validate::email("contact_email", &contact)?)
            };
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewBrigade {
        NewBrigade {
            name: " Brigada Norte ".to_string(),
            region: Some("Valparaíso".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn create_normalizes_fields() {
        let b = Brigade::create(input(), None, Utc::now()).unwrap();
        assert_eq!(b.name, "Brigada Norte");
        assert!(!b.is_claimed());
        assert!(!b.verified);
    }

    #[test]
    fn create_rejects_blank_name_and_bad_email() {
        let blank = NewBrigade { name: "  ".into(), ..Default::default() };
        assert!(Brigade::create(blank, None, Utc::now()).is_err());

        let bad = NewBrigade { contact_email: Some("nope".into()), ..input() };
        assert!(Brigade::create(bad, None, Utc::now()).is_err());
    }

    #[test]
    fn claim_is_one_shot() {
        let mut b = Brigade::create(input(), None, Utc::now()).unwrap();
        let ana = UserId::composite("ana", Some("t"));
        let bo = UserId::composite("bo", Some("t"));

        b.claim(&ana, Utc::now()).unwrap();
        assert_eq!(b.claimed_by.as_ref(), Some(&ana));
        assert!(matches!(b.claim(&bo, Utc::now()), Err(DomainError::Conflict(_))));
        assert!(matches!(b.claim(&ana, Utc::now()), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn patch_clears_optional_fields_with_blank() {
        let mut b = Brigade::create(input(), None, Utc::now()).unwrap();
        b.apply(
            BrigadePatch {
                region: Some("".into()),
                description: Some("Rural fire response".into()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(b.region, None);
        assert_eq!(b.description.as_deref(), Some("Rural fire response"));
        assert_eq!(b.name, "Brigada Norte");
    }
}
