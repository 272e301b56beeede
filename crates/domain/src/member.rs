use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brigade_auth::{Membership, MembershipStatus, Role};
use brigade_core::{BrigadeId, DomainError, DomainResult, UserId};

/// Membership record of a user in a brigade, including display details.
///
/// At most one row exists per (brigade, user). Removal is a status change,
/// never a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub brigade_id: BrigadeId,
    pub user_id: UserId,
    pub role: Role,
    pub status: MembershipStatus,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub invited_by: Option<UserId>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn new(
        brigade_id: BrigadeId,
        user_id: UserId,
        role: Role,
        status: MembershipStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            brigade_id,
            user_id,
            role,
            status,
            display_name: None,
            email: None,
            invited_by: None,
            joined_at: now,
            updated_at: now,
        }
    }

    pub fn with_profile(mut self, display_name: Option<String>, email: Option<String>) -> Self {
        self.display_name = display_name;
        self.email = email;
        self
    }

    pub fn membership(&self) -> Membership {
        Membership {
            brigade_id: self.brigade_id,
            user_id: self.user_id.clone(),
            role: self.role.clone(),
            status: self.status,
        }
    }

    pub fn is_active_admin(&self) -> bool {
        self.status == MembershipStatus::Active && self.role.is_admin()
    }

    /// Pending → active.
    pub fn approve(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != MembershipStatus::Pending {
            return Err(DomainError::conflict(format!(
                "only pending members can be approved (status: {})",
                self.status
            )));
        }
        self.status = MembershipStatus::Active;
        self.updated_at = now;
        Ok(())
    }

    pub fn change_role(&mut self, role: Role, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != MembershipStatus::Active {
            return Err(DomainError::conflict(format!(
                "role can only be changed for active members (status: {})",
                self.status
            )));
        }
        self.role = role;
        self.updated_at = now;
        Ok(())
    }

    pub fn remove(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == MembershipStatus::Removed {
            return Err(DomainError::conflict("member has already been removed"));
        }
        self.status = MembershipStatus::Removed;
        self.updated_at = now;
        Ok(())
    }

    /// A removed member asking to come back goes through approval again.
    pub fn request_rejoin(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            MembershipStatus::Removed => {
                self.status = MembershipStatus::Pending;
                self.role = Role::VIEWER;
                self.updated_at = now;
                Ok(())
            }
            MembershipStatus::Pending => Err(DomainError::conflict("a join request is already pending")),
            MembershipStatus::Active => Err(DomainError::conflict("already a member of this brigade")),
        }
    }

    /// Reactivate (or keep active) with the given role, as when accepting an invitation.
    pub fn activate_with(&mut self, role: Role, now: DateTime<Utc>) {
        self.role = role;
        self.status = MembershipStatus::Active;
        self.updated_at = now;
    }
}

pub fn active_admin_count(members: &[Member]) -> usize {
    members.iter().filter(|m| m.is_active_admin()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: Role, status: MembershipStatus) -> Member {
        Member::new(
            BrigadeId::new(),
            UserId::composite("ana", Some("t")),
            role,
            status,
            Utc::now(),
        )
    }

    #[test]
    fn approve_only_from_pending() {
        let mut m = member(Role::VIEWER, MembershipStatus::Pending);
        m.approve(Utc::now()).unwrap();
        assert_eq!(m.status, MembershipStatus::Active);
        assert!(m.approve(Utc::now()).is_err());
    }

    #[test]
    fn role_change_requires_active() {
        let mut m = member(Role::VIEWER, MembershipStatus::Pending);
        assert!(m.change_role(Role::OPERATOR, Utc::now()).is_err());
        m.approve(Utc::now()).unwrap();
        m.change_role(Role::OPERATOR, Utc::now()).unwrap();
        assert_eq!(m.role, Role::OPERATOR);
    }

    #[test]
    fn removal_is_soft_and_terminal_until_rejoin() {
        let mut m = member(Role::ADMIN, MembershipStatus::Active);
        m.remove(Utc::now()).unwrap();
        assert_eq!(m.status, MembershipStatus::Removed);
        assert!(!m.membership().is_active());
        assert!(m.remove(Utc::now()).is_err());

        m.request_rejoin(Utc::now()).unwrap();
        assert_eq!(m.status, MembershipStatus::Pending);
        assert_eq!(m.role, Role::VIEWER);
    }

    #[test]
    fn counts_only_active_admins() {
        let members = vec![
            member(Role::ADMIN, MembershipStatus::Active),
            member(Role::ADMIN, MembershipStatus::Removed),
            member(Role::ADMIN, MembershipStatus::Pending),
            member(Role::OPERATOR, MembershipStatus::Active),
        ];
        assert_eq!(active_admin_count(&members), 1);
    }
}
