use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use brigade_core::{BrigadeId, UserId};

use crate::Role;

/// Lifecycle status of a membership.
///
/// `Removed` is a soft delete: the row is kept but grants nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Active,
    Removed,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Active => "active",
            MembershipStatus::Removed => "removed",
        }
    }
}

impl core::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization view of a user's membership in one brigade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub brigade_id: BrigadeId,
    pub user_id: UserId,
    pub role: Role,
    pub status: MembershipStatus,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

/// Capability to find a user's membership in a brigade.
///
/// The permission evaluator depends only on this trait, never on storage.
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    async fn find_membership(
        &self,
        user_id: &UserId,
        brigade_id: &BrigadeId,
    ) -> anyhow::Result<Option<Membership>>;
}
