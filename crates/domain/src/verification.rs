use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brigade_core::{BrigadeId, DomainError, DomainResult, UserId};

use crate::validate;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

/// Request from a brigade to be listed as verified. One row per brigade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub brigade_id: BrigadeId,
    pub status: VerificationStatus,
    pub contact_name: String,
    pub contact_phone: String,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub submitted_by: UserId,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_by: Option<UserId>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationRequest {
    pub contact_name: String,
    pub contact_phone: String,
    pub registration_number: Option<String>,
    pub notes: Option<String>,
}

impl Verification {
    /// Build a pending request. `previous` is the brigade's existing request, if any.
    pub fn submit(
        brigade_id: BrigadeId,
        input: VerificationRequest,
        previous: Option<&Verification>,
        submitted_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if previous.is_some_and(|p| p.status == VerificationStatus::Approved) {
            return Err(DomainError::conflict("brigade is already verified"));
        }

        let phone = validate::required("contact_phone", &input.contact_phone, 32)?;
        if !phone.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')')) {
            return Err(DomainError::validation("contact_phone contains invalid characters"));
        }

        Ok(Self {
            brigade_id,
            status: VerificationStatus::Pending,
            contact_name: validate::required("contact_name", &input.contact_name, 120)?,
            contact_phone: phone,
            registration_number: validate::optional(
                "registration_number",
                input.registration_number.as_deref(),
                64,
            )?,
            notes: validate::optional("notes", input.notes.as_deref(), 2000)?,
            submitted_by,
            submitted_at: now,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
        })
    }

    pub fn review(
        &mut self,
        approved: bool,
        reviewer: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != VerificationStatus::Pending {
            return Err(DomainError::conflict("only pending verification requests can be reviewed"));
        }
        self.status = if approved {
            VerificationStatus::Approved
        } else {
            VerificationStatus::Rejected
        };
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(now);
        self.review_notes = validate::optional("review_notes", notes.as_deref(), 2000)?;
        Ok(())
    }
}
