// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::assert_all_stores;
use crate::associations::{AssociationStore, Changeset, Detached};
use crate::entities::EntityStore;
use crate::kinds::{EntityId, EntityKind, RelationKind};
use crate::traits::Transaction;

/// Insert `count` entities of the given kind in one transaction and return their ids.
async fn seed<S>(store: &S, kind: EntityKind, count: usize) -> Vec<EntityId>
where
    S: EntityStore + Transaction,
{
    let permit = store.begin().await.unwrap();
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        ids.push(
            store
                .insert_entity(kind, &format!("{kind}-{i}"))
                .await
                .unwrap(),
        );
    }
    store.commit(permit).await.unwrap();
    ids
}

#[tokio::test]
async fn insert_is_idempotent() {
    assert_all_stores!(|store| async {
        let roles = seed(&store, EntityKind::Role, 1).await;
        let permissions = seed(&store, EntityKind::Permission, 3).await;
        let role = roles[0];

        let permit = store.begin().await.unwrap();
        let changeset = store
            .insert_members(RelationKind::RolePermission, role, &permissions[..2])
            .await
            .unwrap();
        assert_eq!(changeset.added, permissions[..2].to_vec());
        assert!(changeset.unresolved.is_empty());

        // Present pairs are skipped without error.
        let changeset = store
            .insert_members(RelationKind::RolePermission, role, &permissions)
            .await
            .unwrap();
        assert_eq!(changeset.added, vec![permissions[2]]);
        assert!(changeset.unresolved.is_empty());
        store.commit(permit).await.unwrap();

        let members = store
            .list_members(RelationKind::RolePermission, role)
            .await
            .unwrap();
        assert_eq!(members, permissions);
    });
}

#[tokio::test]
async fn insert_reports_unresolved_members() {
    assert_all_stores!(|store| async {
        let groups = seed(&store, EntityKind::Group, 1).await;
        let users = seed(&store, EntityKind::User, 2).await;

        // Second user disappears.
        let permit = store.begin().await.unwrap();
        store
            .soft_delete_entity(EntityKind::User, users[1])
            .await
            .unwrap();
        store.commit(permit).await.unwrap();

        let permit = store.begin().await.unwrap();
        let changeset = store
            .insert_members(RelationKind::GroupMember, groups[0], &[users[0], users[1], 404])
            .await
            .unwrap();
        assert_eq!(changeset.added, vec![users[0]]);
        assert_eq!(changeset.unresolved, vec![users[1], 404]);

        // An owner which doesn't resolve leaves every member unresolved.
        let changeset = store
            .insert_members(RelationKind::GroupMember, 404, &[users[0]])
            .await
            .unwrap();
        assert!(changeset.added.is_empty());
        assert_eq!(changeset.unresolved, vec![users[0]]);
        store.commit(permit).await.unwrap();
    });
}

#[tokio::test]
async fn delete_is_idempotent() {
    assert_all_stores!(|store| async {
        let users = seed(&store, EntityKind::User, 1).await;
        let roles = seed(&store, EntityKind::Role, 2).await;
        let user = users[0];

        let permit = store.begin().await.unwrap();
        store
            .insert_members(RelationKind::UserRole, user, &roles)
            .await
            .unwrap();
        store.commit(permit).await.unwrap();

        let permit = store.begin().await.unwrap();
        let changeset = store
            .delete_members(RelationKind::UserRole, user, &[roles[0], 404])
            .await
            .unwrap();
        assert_eq!(changeset.removed, vec![roles[0]]);

        // Removing again is not an error, it just doesn't remove anything.
        let changeset = store
            .delete_members(RelationKind::UserRole, user, &[roles[0]])
            .await
            .unwrap();
        assert_eq!(changeset, Changeset::default());
        store.commit(permit).await.unwrap();

        let members = store
            .list_members(RelationKind::UserRole, user)
            .await
            .unwrap();
        assert_eq!(members, vec![roles[1]]);
    });
}

#[tokio::test]
async fn replace_writes_minimal_difference() {
    assert_all_stores!(|store| async {
        let roles = seed(&store, EntityKind::Role, 1).await;
        let p = seed(&store, EntityKind::Permission, 4).await;
        let role = roles[0];

        let permit = store.begin().await.unwrap();
        store
            .insert_members(RelationKind::RolePermission, role, &[p[0], p[1], p[2]])
            .await
            .unwrap();
        store.commit(permit).await.unwrap();

        let permit = store.begin().await.unwrap();
        let changeset = store
            .replace_members(RelationKind::RolePermission, role, &[p[1], p[2], p[3]])
            .await
            .unwrap();
        store.commit(permit).await.unwrap();

        // Stable members are neither removed nor re-added.
        assert_eq!(changeset.added, vec![p[3]]);
        assert_eq!(changeset.removed, vec![p[0]]);

        let members = store
            .list_members(RelationKind::RolePermission, role)
            .await
            .unwrap();
        assert_eq!(members, vec![p[1], p[2], p[3]]);

        // Replacing with an empty set clears everything.
        let permit = store.begin().await.unwrap();
        let changeset = store
            .replace_members(RelationKind::RolePermission, role, &[])
            .await
            .unwrap();
        store.commit(permit).await.unwrap();
        assert_eq!(changeset.removed, vec![p[1], p[2], p[3]]);
        assert!(
            store
                .list_members(RelationKind::RolePermission, role)
                .await
                .unwrap()
                .is_empty()
        );
    });
}

#[tokio::test]
async fn rolled_back_writes_leave_no_trace() {
    assert_all_stores!(|store| async {
        let users = seed(&store, EntityKind::User, 1).await;
        let roles = seed(&store, EntityKind::Role, 2).await;

        let permit = store.begin().await.unwrap();
        store
            .insert_members(RelationKind::UserRole, users[0], &roles)
            .await
            .unwrap();
        store.rollback(permit).await.unwrap();

        assert!(
            store
                .list_members(RelationKind::UserRole, users[0])
                .await
                .unwrap()
                .is_empty()
        );
    });
}

#[tokio::test]
async fn detach_entity_from_all_relations() {
    assert_all_stores!(|store| async {
        let users = seed(&store, EntityKind::User, 2).await;
        let roles = seed(&store, EntityKind::Role, 1).await;
        let groups = seed(&store, EntityKind::Group, 2).await;

        let permit = store.begin().await.unwrap();
        store
            .insert_members(RelationKind::UserRole, users[0], &roles)
            .await
            .unwrap();
        for group in &groups {
            store
                .insert_members(RelationKind::GroupMember, *group, &users)
                .await
                .unwrap();
        }
        store.commit(permit).await.unwrap();

        // A user is an owner of roles and a member of groups.
        let permit = store.begin().await.unwrap();
        let detached = store
            .detach_entity(EntityKind::User, users[0])
            .await
            .unwrap();
        store.commit(permit).await.unwrap();

        assert_eq!(
            detached,
            vec![
                Detached {
                    relation: RelationKind::UserRole,
                    owner: users[0],
                    removed: roles.clone(),
                },
                Detached {
                    relation: RelationKind::GroupMember,
                    owner: groups[0],
                    removed: vec![users[0]],
                },
                Detached {
                    relation: RelationKind::GroupMember,
                    owner: groups[1],
                    removed: vec![users[0]],
                },
            ]
        );

        assert!(
            store
                .list_owners(RelationKind::GroupMember, users[0])
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            store
                .list_owners(RelationKind::GroupMember, users[1])
                .await
                .unwrap(),
            groups
        );
    });
}

#[tokio::test]
async fn soft_deleted_entities_are_not_listed() {
    assert_all_stores!(|store| async {
        let roles = seed(&store, EntityKind::Role, 2).await;
        let permissions = seed(&store, EntityKind::Permission, 2).await;

        let permit = store.begin().await.unwrap();
        for role in &roles {
            store
                .insert_members(RelationKind::RolePermission, *role, &permissions)
                .await
                .unwrap();
        }
        store
            .soft_delete_entity(EntityKind::Permission, permissions[0])
            .await
            .unwrap();
        store
            .soft_delete_entity(EntityKind::Role, roles[1])
            .await
            .unwrap();
        store.commit(permit).await.unwrap();

        assert_eq!(
            store
                .list_members(RelationKind::RolePermission, roles[0])
                .await
                .unwrap(),
            vec![permissions[1]]
        );
        assert_eq!(
            store
                .list_owners(RelationKind::RolePermission, permissions[1])
                .await
                .unwrap(),
            vec![roles[0]]
        );

        // The rows themselves are still there until the entity gets detached.
        let permit = store.begin().await.unwrap();
        let changeset = store
            .replace_members(RelationKind::RolePermission, roles[0], &[permissions[1]])
            .await
            .unwrap();
        store.commit(permit).await.unwrap();
        assert_eq!(changeset.removed, vec![permissions[0]]);
    });
}
