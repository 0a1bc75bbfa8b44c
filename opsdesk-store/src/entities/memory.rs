// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use crate::entities::EntityStore;
use crate::kinds::{EntityId, EntityKind};
use crate::memory::{EntityRecord, MemoryError, MemoryStore};

impl EntityStore for MemoryStore {
    type Error = MemoryError;

    async fn insert_entity(&self, kind: EntityKind, name: &str) -> Result<EntityId, MemoryError> {
        self.tx(|state| {
            let records = state.entities.entry(kind).or_default();
            // Identifiers are never re-used, not even for deleted entities.
            let id = match records.last_key_value() {
                Some((last, _)) => last.checked_add(1).ok_or(MemoryError::IdsExhausted(kind))?,
                None => 1,
            };
            records.insert(
                id,
                EntityRecord {
                    name: name.to_string(),
                    deleted: false,
                },
            );
            Ok(id)
        })
        .await
    }

    async fn soft_delete_entity(&self, kind: EntityKind, id: EntityId) -> Result<bool, MemoryError> {
        self.tx(|state| {
            let record = state
                .entities
                .get_mut(&kind)
                .and_then(|records| records.get_mut(&id));
            match record {
                Some(record) if !record.deleted => {
                    record.deleted = true;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
        .await
    }

    async fn existing_entities(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<EntityId>, MemoryError> {
        let found = self
            .read(|state| {
                ids.iter()
                    .copied()
                    .filter(|id| state.is_live(kind, *id))
                    .collect::<BTreeSet<_>>()
            })
            .await;
        Ok(found.into_iter().collect())
    }
}
