use async_trait::async_trait;

use brigade_auth::{Membership, MembershipLookup};
use brigade_core::{BrigadeId, UserId};
use brigade_domain::Member;

use crate::entity::Repository;

/// `MembershipLookup` backed by the members table.
#[derive(Clone)]
pub struct StoreMembershipLookup {
    members: Repository<Member>,
}

impl StoreMembershipLookup {
    pub fn new(members: Repository<Member>) -> Self {
        Self { members }
    }
}

#[async_trait]
impl MembershipLookup for StoreMembershipLookup {
    async fn find_membership(
        &self,
        user_id: &UserId,
        brigade_id: &BrigadeId,
    ) -> anyhow::Result<Option<Membership>> {
        let member = self
            .members
            .get(&brigade_id.to_string(), user_id.as_str())
            .await?;
        Ok(member.map(|m| m.membership()))
    }
}
