// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::assert_all_stores;
use crate::entities::EntityStore;
use crate::kinds::EntityKind;
use crate::traits::Transaction;

#[tokio::test]
async fn insert_and_look_up_entities() {
    assert_all_stores!(|store| async {
        let permit = store.begin().await.unwrap();
        let admin = store.insert_entity(EntityKind::Role, "admin").await.unwrap();
        let editor = store.insert_entity(EntityKind::Role, "editor").await.unwrap();
        store.commit(permit).await.unwrap();

        assert_ne!(admin, editor);

        // Unknown identifiers are left out, duplicates are collapsed.
        let found = store
            .existing_entities(EntityKind::Role, &[editor, 999, admin, editor])
            .await
            .unwrap();
        let mut expected = vec![admin, editor];
        expected.sort();
        assert_eq!(found, expected);

        // Kinds don't mix.
        let found = store
            .existing_entities(EntityKind::Permission, &[admin])
            .await
            .unwrap();
        assert!(found.is_empty());
    });
}

#[tokio::test]
async fn soft_deleted_entities_do_not_exist() {
    assert_all_stores!(|store| async {
        let permit = store.begin().await.unwrap();
        let alice = store.insert_entity(EntityKind::User, "alice").await.unwrap();
        let bob = store.insert_entity(EntityKind::User, "bob").await.unwrap();
        store.commit(permit).await.unwrap();

        let permit = store.begin().await.unwrap();
        assert!(store.soft_delete_entity(EntityKind::User, bob).await.unwrap());
        // Deleting twice has no effect.
        assert!(!store.soft_delete_entity(EntityKind::User, bob).await.unwrap());
        assert!(!store.soft_delete_entity(EntityKind::User, 999).await.unwrap());
        store.commit(permit).await.unwrap();

        let found = store
            .existing_entities(EntityKind::User, &[alice, bob])
            .await
            .unwrap();
        assert_eq!(found, vec![alice]);
    });
}

#[tokio::test]
async fn uncommitted_entities_are_not_visible() {
    assert_all_stores!(|store| async {
        let permit = store.begin().await.unwrap();
        let group = store
            .insert_entity(EntityKind::Group, "on-call")
            .await
            .unwrap();
        store.rollback(permit).await.unwrap();

        let found = store
            .existing_entities(EntityKind::Group, &[group])
            .await
            .unwrap();
        assert!(found.is_empty());
    });
}

#[tokio::test]
async fn large_lookups() {
    assert_all_stores!(|store| async {
        let permit = store.begin().await.unwrap();
        let read = store.insert_entity(EntityKind::Permission, "read").await.unwrap();
        let write = store.insert_entity(EntityKind::Permission, "write").await.unwrap();
        store.commit(permit).await.unwrap();

        // More identifiers than SQLite accepts as variables of a single statement, with the
        // existing ones repeated at both ends.
        let mut ids: Vec<_> = (1..=40_000).collect();
        ids.extend([write, read]);

        let found = store
            .existing_entities(EntityKind::Permission, &ids)
            .await
            .unwrap();
        let mut expected = vec![read, write];
        expected.sort();
        assert_eq!(found, expected);
    });
}
