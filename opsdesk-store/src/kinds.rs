// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Numeric identifier of any entity on the platform.
pub type EntityId = u32;

/// Kinds of entities which can take part in an association.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Role,
    Permission,
    /// Responsibility group.
    Group,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::User,
        EntityKind::Role,
        EntityKind::Permission,
        EntityKind::Group,
    ];

    #[cfg(feature = "sqlite")]
    pub(crate) fn table(&self) -> &'static str {
        match self {
            EntityKind::User => "users_v1",
            EntityKind::Role => "roles_v1",
            EntityKind::Permission => "permissions_v1",
            EntityKind::Group => "responsibility_groups_v1",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Role => "role",
            EntityKind::Permission => "permission",
            EntityKind::Group => "group",
        };
        write!(f, "{name}")
    }
}

/// Tag identifying which two entity kinds a relationship connects.
///
/// The first kind is always the "owner" side, the second the "member" side:
///
/// ```text
/// UserRole        User  -> Role
/// RolePermission  Role  -> Permission
/// GroupMember     Group -> User
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    UserRole,
    RolePermission,
    GroupMember,
}

impl RelationKind {
    pub const ALL: [RelationKind; 3] = [
        RelationKind::UserRole,
        RelationKind::RolePermission,
        RelationKind::GroupMember,
    ];

    pub fn owner_kind(&self) -> EntityKind {
        match self {
            RelationKind::UserRole => EntityKind::User,
            RelationKind::RolePermission => EntityKind::Role,
            RelationKind::GroupMember => EntityKind::Group,
        }
    }

    pub fn member_kind(&self) -> EntityKind {
        match self {
            RelationKind::UserRole => EntityKind::Role,
            RelationKind::RolePermission => EntityKind::Permission,
            RelationKind::GroupMember => EntityKind::User,
        }
    }

    #[cfg(feature = "sqlite")]
    pub(crate) fn table(&self) -> &'static str {
        match self {
            RelationKind::UserRole => "user_roles_v1",
            RelationKind::RolePermission => "role_permissions_v1",
            RelationKind::GroupMember => "group_members_v1",
        }
    }
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::UserRole => "user_role",
            RelationKind::RolePermission => "role_permission",
            RelationKind::GroupMember => "group_member",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, RelationKind};

    #[test]
    fn relation_sides() {
        assert_eq!(RelationKind::UserRole.owner_kind(), EntityKind::User);
        assert_eq!(RelationKind::UserRole.member_kind(), EntityKind::Role);
        assert_eq!(RelationKind::GroupMember.owner_kind(), EntityKind::Group);
        assert_eq!(RelationKind::GroupMember.member_kind(), EntityKind::User);
    }

    #[test]
    fn display_names() {
        assert_eq!(RelationKind::RolePermission.to_string(), "role_permission");
        assert_eq!(EntityKind::Group.to_string(), "group");
    }
}
