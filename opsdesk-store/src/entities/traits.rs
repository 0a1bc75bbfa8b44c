// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use crate::kinds::{EntityId, EntityKind};

/// Interface for looking up the existence of entities.
///
/// Entities are soft-deleted: a deleted entity keeps its row but is treated as inexistant by all
/// lookups and association writes.
pub trait EntityStore {
    type Error: Error;

    /// Insert a new entity and return its identifier.
    ///
    /// Needs to be called within a transaction.
    fn insert_entity(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> impl Future<Output = Result<EntityId, Self::Error>>;

    /// Mark an entity as deleted.
    ///
    /// Returns `true` when the entity existed and was not deleted before. Needs to be called
    /// within a transaction.
    fn soft_delete_entity(
        &self,
        kind: EntityKind,
        id: EntityId,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Returns the subset of the given identifiers which exist and are not deleted.
    ///
    /// Reads committed state only, results are sorted and free of duplicates.
    fn existing_entities(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> impl Future<Output = Result<Vec<EntityId>, Self::Error>>;
}
