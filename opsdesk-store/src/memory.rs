// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, RwLock, Semaphore};
use tracing::warn;

use crate::kinds::{EntityId, EntityKind, RelationKind};

#[derive(Clone, Debug)]
pub(crate) struct EntityRecord {
    #[allow(unused)]
    pub(crate) name: String,
    pub(crate) deleted: bool,
}

/// Complete database state of the in-memory backend.
#[derive(Clone, Debug, Default)]
pub(crate) struct State {
    pub(crate) entities: HashMap<EntityKind, BTreeMap<EntityId, EntityRecord>>,
    pub(crate) associations: HashMap<RelationKind, BTreeSet<(EntityId, EntityId)>>,
}

impl State {
    pub(crate) fn is_live(&self, kind: EntityKind, id: EntityId) -> bool {
        self.entities
            .get(&kind)
            .and_then(|records| records.get(&id))
            .is_some_and(|record| !record.deleted)
    }

    pub(crate) fn pairs(&self, relation: RelationKind) -> impl Iterator<Item = &(EntityId, EntityId)> {
        self.associations
            .get(&relation)
            .into_iter()
            .flat_map(|pairs| pairs.iter())
    }
}

/// In-memory store.
///
/// This does not persist data permanently, all changes are lost when the process ends. Use this
/// only in development or test contexts.
///
/// Transactions behave like the ones of `SqliteStore`: they are strictly serialised, writes go to
/// a staged copy of the state which replaces the committed state on `commit` and is discarded on
/// `rollback`. Reads outside of a transaction only observe committed state.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    committed: Arc<RwLock<State>>,
    staged: Arc<Mutex<Option<State>>>,
    semaphore: Arc<Semaphore>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            committed: Arc::default(),
            staged: Arc::default(),
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Run a function against the staged state of the current transaction.
    pub(crate) async fn tx<F, R>(&self, f: F) -> Result<R, MemoryError>
    where
        F: FnOnce(&mut State) -> Result<R, MemoryError>,
    {
        let mut staged = self.staged.lock().await;
        let state = staged.as_mut().ok_or(MemoryError::TransactionMissing)?;
        f(state)
    }

    /// Run a function against the committed state.
    pub(crate) async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&State) -> R,
    {
        let state = self.committed.read().await;
        f(&state)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::traits::Transaction for MemoryStore {
    type Error = MemoryError;

    type Permit = MemoryPermit;

    async fn begin(&self) -> Result<MemoryPermit, MemoryError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("if semaphore is closed then the whole struct is gone as well");

        let mut staged = self.staged.lock().await;
        if staged.take().is_some() {
            warn!("discarding transaction abandoned by previous permit holder");
        }
        staged.replace(self.committed.read().await.clone());

        Ok(MemoryPermit(permit))
    }

    async fn rollback(&self, permit: MemoryPermit) -> Result<(), MemoryError> {
        let Some(_) = self.staged.lock().await.take() else {
            panic!("can't have no transaction without dropping permit first")
        };
        drop(permit);
        Ok(())
    }

    async fn commit(&self, permit: MemoryPermit) -> Result<(), MemoryError> {
        let Some(state) = self.staged.lock().await.take() else {
            panic!("can't have no transaction without dropping permit first")
        };
        *self.committed.write().await = state;
        drop(permit);
        Ok(())
    }
}

#[allow(unused)]
pub struct MemoryPermit(OwnedSemaphorePermit);

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Writes can only ever occur if a transaction was started _before_.
    #[error("tried to interact with inexistant transaction")]
    TransactionMissing,

    #[error("no identifiers left for entity kind {0}")]
    IdsExhausted(EntityKind),
}
