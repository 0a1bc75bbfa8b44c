// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for testing code built on top of the synchronizer.
use std::time::Duration;

use opsdesk_store::associations::Detached;
use opsdesk_store::{
    AssociationStore, Changeset, EntityId, EntityKind, EntityStore, RelationKind, Transaction,
};

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Insert `count` entities of the given kind in one transaction and return their ids.
pub async fn seed<S>(store: &S, kind: EntityKind, count: usize) -> Vec<EntityId>
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

/// Soft-delete an entity in its own transaction.
pub async fn delete<S>(store: &S, kind: EntityKind, id: EntityId)
where
    S: EntityStore + Transaction,
{
    let permit = store.begin().await.unwrap();
    store.soft_delete_entity(kind, id).await.unwrap();
    store.commit(permit).await.unwrap();
}

/// Store wrapper which misbehaves in controlled ways.
///
/// - `stalled_writes`: association writes are applied but then take this long to return, which
///   gives tests a window to cancel an operation while its transaction is open.
/// - `stale_lookups`: existence lookups claim every requested entity exists, simulating entities
///   which get deleted right after validation.
#[derive(Clone, Debug)]
pub struct FaultyStore<S> {
    inner: S,
    stalled_writes: Option<Duration>,
    stale_lookups: bool,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stalled_writes: None,
            stale_lookups: false,
        }
    }

    pub fn stalled_writes(mut self, duration: Duration) -> Self {
        self.stalled_writes = Some(duration);
        self
    }

    pub fn stale_lookups(mut self) -> Self {
        self.stale_lookups = true;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn stall(&self) {
        if let Some(duration) = self.stalled_writes {
            tokio::time::sleep(duration).await;
        }
    }
}

impl<S> Transaction for FaultyStore<S>
where
    S: Transaction,
{
    type Error = S::Error;

    type Permit = S::Permit;

    async fn begin(&self) -> Result<Self::Permit, Self::Error> {
        self.inner.begin().await
    }

    async fn rollback(&self, permit: Self::Permit) -> Result<(), Self::Error> {
        self.inner.rollback(permit).await
    }

    async fn commit(&self, permit: Self::Permit) -> Result<(), Self::Error> {
        self.inner.commit(permit).await
    }
}

impl<S> EntityStore for FaultyStore<S>
where
    S: EntityStore,
{
    type Error = S::Error;

    async fn insert_entity(&self, kind: EntityKind, name: &str) -> Result<EntityId, Self::Error> {
        self.inner.insert_entity(kind, name).await
    }

    async fn soft_delete_entity(&self, kind: EntityKind, id: EntityId) -> Result<bool, Self::Error> {
        self.inner.soft_delete_entity(kind, id).await
    }

    async fn existing_entities(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<EntityId>, Self::Error> {
        if self.stale_lookups {
            let mut ids = ids.to_vec();
            ids.sort_unstable();
            ids.dedup();
            return Ok(ids);
        }
        self.inner.existing_entities(kind, ids).await
    }
}

impl<S> AssociationStore for FaultyStore<S>
where
    S: AssociationStore,
{
    type Error = S::Error;

    async fn insert_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> Result<Changeset, Self::Error> {
        let changeset = self.inner.insert_members(relation, owner, members).await?;
        self.stall().await;
        Ok(changeset)
    }

    async fn delete_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> Result<Changeset, Self::Error> {
        let changeset = self.inner.delete_members(relation, owner, members).await?;
        self.stall().await;
        Ok(changeset)
    }

    async fn replace_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> Result<Changeset, Self::Error> {
        let changeset = self.inner.replace_members(relation, owner, members).await?;
        self.stall().await;
        Ok(changeset)
    }

    async fn detach_entity(
        &self,
        kind: EntityKind,
        id: EntityId,
    ) -> Result<Vec<Detached>, Self::Error> {
        let detached = self.inner.detach_entity(kind, id).await?;
        self.stall().await;
        Ok(detached)
    }

    async fn list_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
    ) -> Result<Vec<EntityId>, Self::Error> {
        self.inner.list_members(relation, owner).await
    }

    async fn list_owners(
        &self,
        relation: RelationKind,
        member: EntityId,
    ) -> Result<Vec<EntityId>, Self::Error> {
        self.inner.list_owners(relation, member).await
    }
}
