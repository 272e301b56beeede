use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use brigade_auth::Role;
use brigade_core::{BrigadeId, DomainError, DomainResult, InvitationId, UserId};

use crate::validate;

/// Invitations are valid for a week.
pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Cancelled,
}

/// Invitation for an email address to join a brigade with a given role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub brigade_id: BrigadeId,
    pub id: InvitationId,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted_by: Option<UserId>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn create(
        brigade_id: BrigadeId,
        email: &str,
        role: Role,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            brigade_id,
            id: InvitationId::new(),
            email: validate::email("email", email)?,
            role,
            status: InvitationStatus::Pending,
            created_by,
            created_at: now,
            expires_at: now + Duration::days(INVITATION_TTL_DAYS),
            accepted_by: None,
            accepted_at: None,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Accept on behalf of `user`. When both the invitation and the caller
    /// have an email, they must match.
    pub fn accept(&mut self, user: &UserId, user_email: Option<&str>, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            InvitationStatus::Pending => {}
            InvitationStatus::Accepted => return Err(DomainError::conflict("invitation has already been accepted")),
            InvitationStatus::Cancelled => return Err(DomainError::conflict("invitation has been cancelled")),
        }
        if self.is_expired(now) {
            return Err(DomainError::conflict("invitation has expired"));
        }
        if let Some(email) = user_email {
            if !email.trim().eq_ignore_ascii_case(&self.email) {
                return Err(DomainError::forbidden("invitation was issued to a different email address"));
            }
        }
        self.status = InvitationStatus::Accepted;
        self.accepted_by = Some(user.clone());
        self.accepted_at = Some(now);
        Ok(())
    }

    pub fn cancel(&mut self) -> DomainResult<()> {
        if self.status != InvitationStatus::Pending {
            return Err(DomainError::conflict("only pending invitations can be cancelled"));
        }
        self.status = InvitationStatus::Cancelled;
        Ok(())
    }
}
