use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Permission vocabulary for brigade-scoped operations.
///
/// Closed set: the role table below is the only source of grants.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageRoutes,
    ManageMembers,
    InviteMembers,
    ApproveMembers,
    RemoveMembers,
    PromoteAdmin,
    DemoteAdmin,
    EditSettings,
    StartNavigation,
    ViewMembers,
    CancelInvitation,
}

impl Permission {
    pub const ALL: [Permission; 11] = [
        Permission::ManageRoutes,
        Permission::ManageMembers,
        Permission::InviteMembers,
        Permission::ApproveMembers,
        Permission::RemoveMembers,
        Permission::PromoteAdmin,
        Permission::DemoteAdmin,
        Permission::EditSettings,
        Permission::StartNavigation,
        Permission::ViewMembers,
        Permission::CancelInvitation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageRoutes => "manage_routes",
            Permission::ManageMembers => "manage_members",
            Permission::InviteMembers => "invite_members",
            Permission::ApproveMembers => "approve_members",
            Permission::RemoveMembers => "remove_members",
            Permission::PromoteAdmin => "promote_admin",
            Permission::DemoteAdmin => "demote_admin",
            Permission::EditSettings => "edit_settings",
            Permission::StartNavigation => "start_navigation",
            Permission::ViewMembers => "view_members",
            Permission::CancelInvitation => "cancel_invitation",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission '{s}'"))
    }
}

const ADMIN_PERMISSIONS: &[Permission] = &Permission::ALL;

const OPERATOR_PERMISSIONS: &[Permission] = &[
    Permission::ManageRoutes,
    Permission::InviteMembers,
    Permission::ApproveMembers,
    Permission::StartNavigation,
    Permission::ViewMembers,
    Permission::CancelInvitation,
];

const VIEWER_PERMISSIONS: &[Permission] = &[Permission::StartNavigation, Permission::ViewMembers];

/// Static role → permission table. Unknown roles get nothing.
pub fn permissions_for_role(role: &str) -> &'static [Permission] {
    match role {
        "admin" => ADMIN_PERMISSIONS,
        "operator" => OPERATOR_PERMISSIONS,
        "viewer" => VIEWER_PERMISSIONS,
        _ => &[],
    }
}

pub fn role_has_permission(role: &str, permission: Permission) -> bool {
    permissions_for_role(role).contains(&permission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_table_is_nested() {
        for p in permissions_for_role("viewer") {
            assert!(role_has_permission("operator", *p), "operator lacks {p}");
        }
        for p in permissions_for_role("operator") {
            assert!(role_has_permission("admin", *p), "admin lacks {p}");
        }
    }

    #[test]
    fn admin_holds_every_permission() {
        for p in Permission::ALL {
            assert!(role_has_permission("admin", p));
        }
    }

    #[test]
    fn unknown_role_is_denied_everything() {
        assert!(permissions_for_role("owner").is_empty());
        assert!(permissions_for_role("Admin").is_empty());
    }

    #[test]
    fn viewer_cannot_manage_routes() {
        assert!(!role_has_permission("viewer", Permission::ManageRoutes));
        assert!(role_has_permission("admin", Permission::ManageRoutes));
    }

    #[test]
    fn names_parse_back() {
        for p in Permission::ALL {
            assert_eq!(p.as_str().parse::<Permission>().unwrap(), p);
        }
        assert!("delete_everything".parse::<Permission>().is_err());
    }
}
