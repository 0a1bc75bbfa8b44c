// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use opsdesk_store::{EntityId, EntityKind, EntityStore};
use tracing::trace;

/// Result of an existence lookup.
///
/// `found` and `missing` are disjoint, sorted and together contain every requested identifier
/// exactly once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExistenceCheck {
    pub found: Vec<EntityId>,
    pub missing: Vec<EntityId>,
}

impl ExistenceCheck {
    pub fn all_found(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Determines which entities of a kind exist.
///
/// Storage failures are returned as errors and never reported as missing entities, callers must
/// not mistake "could not determine" for "not found".
#[derive(Clone, Debug)]
pub struct EntityExistenceValidator<S> {
    store: S,
}

impl<S> EntityExistenceValidator<S>
where
    S: EntityStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Partition the given identifiers into existing and missing ones.
    ///
    /// Reads committed state and has no side effects. An empty input yields an empty check,
    /// rejecting empty requests is the caller's responsibility.
    pub async fn validate_exist(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<ExistenceCheck, S::Error> {
        let requested: BTreeSet<EntityId> = ids.iter().copied().collect();
        if requested.is_empty() {
            return Ok(ExistenceCheck::default());
        }

        let requested_ids: Vec<EntityId> = requested.iter().copied().collect();
        let found: BTreeSet<EntityId> = self
            .store
            .existing_entities(kind, &requested_ids)
            .await?
            .into_iter()
            // Only accept what was asked for, a misbehaving store can't smuggle in other ids.
            .filter(|id| requested.contains(id))
            .collect();

        let missing: Vec<EntityId> = requested.difference(&found).copied().collect();
        trace!(%kind, found = found.len(), missing = missing.len(), "validated existence");

        Ok(ExistenceCheck {
            found: found.into_iter().collect(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use opsdesk_store::{EntityKind, EntityStore, MemoryStore, SqliteStore, Transaction};

    use super::{EntityExistenceValidator, ExistenceCheck};

    #[tokio::test]
    async fn partitions_requested_ids() {
        let store = MemoryStore::new();
        let permit = store.begin().await.unwrap();
        let first = store.insert_entity(EntityKind::Permission, "read").await.unwrap();
        let second = store.insert_entity(EntityKind::Permission, "write").await.unwrap();
        store.commit(permit).await.unwrap();

        let validator = EntityExistenceValidator::new(store);
        let check = validator
            .validate_exist(EntityKind::Permission, &[second, 77, first, 77, second])
            .await
            .unwrap();

        assert_eq!(
            check,
            ExistenceCheck {
                found: vec![first, second],
                missing: vec![77],
            }
        );
        assert!(!check.all_found());
    }

    #[tokio::test]
    async fn empty_request_is_empty_check() {
        let validator = EntityExistenceValidator::new(SqliteStore::temporary().await);
        let check = validator
            .validate_exist(EntityKind::User, &[])
            .await
            .unwrap();
        assert_eq!(check, ExistenceCheck::default());
        assert!(check.all_found());
    }

    #[tokio::test]
    async fn storage_failure_is_not_missing() {
        let store = SqliteStore::temporary().await;
        store.close().await;

        let validator = EntityExistenceValidator::new(store);
        assert!(
            validator
                .validate_exist(EntityKind::Role, &[1])
                .await
                .is_err()
        );
    }
}
