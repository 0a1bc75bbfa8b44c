// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use opsdesk_store::{
    AssociationStore, Changeset, EntityId, EntityKind, EntityStore, RelationKind, Transaction,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, warn};

use crate::audit::{AuditEvent, AuditSink, NoopAuditSink};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::validator::EntityExistenceValidator;


/// Engine for adding, removing and replacing the members of an owner entity.
///
/// Every operation runs through the same phases:
///
/// ```text
/// Idle --> Validating --(fail)--> Idle (unchanged)
///              |
///             (ok)
///              v
///          Mutating --> Committed
///              |
///              `------> RolledBack
/// ```
///
/// Validation reads committed state without opening a transaction. The mutation happens in one
/// transaction which is committed on success and rolled back on any error, cancellation or
/// timeout. The engine holds no state between calls and never retries: concurrency comes from
/// callers sharing the same store, where the transaction provider serialises all writers.
///
/// Concurrent `replace` calls on the same owner are not merged, the one committing last wins in
/// full. A `replace` which started before a concurrent `add` committed can overwrite its effect.
#[derive(Clone, Debug)]
pub struct Synchronizer<S, A = NoopAuditSink> {
    store: S,
    validator: EntityExistenceValidator<S>,
    audit: A,
    config: SyncConfig,
}

impl<S> Synchronizer<S, NoopAuditSink>
where
    S: EntityStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self::with_audit(store, NoopAuditSink, SyncConfig::default())
    }
}

impl<S, A> Synchronizer<S, A>
where
    S: EntityStore + Clone,
{
    pub fn with_audit(store: S, audit: A, config: SyncConfig) -> Self {
        Self {
            validator: EntityExistenceValidator::new(store.clone()),
            store,
            audit,
            config,
        }
    }
}

impl<S, A, E> Synchronizer<S, A>
where
    S: Transaction<Error = E> + EntityStore<Error = E> + AssociationStore<Error = E>,
    A: AuditSink,
    E: Error,
{
    /// Associate members with an owner.
    ///
    /// All or nothing: if a single member does not exist, no association is written at all.
    /// Already present associations are left as they are.
    pub async fn add(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), SyncError<E>> {
        async {
            if members.is_empty() {
                return Err(SyncError::InvalidInput { relation, owner });
            }

            self.validate_owner(relation, owner, cancel).await?;
            self.validate_members(relation, members, cancel).await?;

            let changeset = self
                .mutate(cancel, async |store| {
                    let changeset = store
                        .insert_members(relation, owner, members)
                        .await
                        .map_err(SyncError::Storage)?;
                    ensure_resolved(relation, owner, changeset)
                })
                .await?;

            debug!(added = ?changeset.added, "added members");
            self.publish(relation, owner, changeset);
            Ok::<_, SyncError<E>>(())
        }
        .instrument(debug_span!("add", %relation, owner))
        .await
    }

    /// Disassociate members from an owner.
    ///
    /// Removing members which were never associated is not an error. Members are not validated,
    /// associations of deleted members can be removed as well.
    pub async fn remove(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), SyncError<E>> {
        async {
            if members.is_empty() {
                return Err(SyncError::InvalidInput { relation, owner });
            }

            self.validate_owner(relation, owner, cancel).await?;

            let changeset = self
                .mutate(cancel, async |store| {
                    store
                        .delete_members(relation, owner, members)
                        .await
                        .map_err(SyncError::Storage)
                })
                .await?;

            debug!(removed = ?changeset.removed, "removed members");
            self.publish(relation, owner, changeset);
            Ok::<_, SyncError<E>>(())
        }
        .instrument(debug_span!("remove", %relation, owner))
        .await
    }

    /// Make the given set the complete membership of an owner.
    ///
    /// An empty set clears all associations of the owner. If a single member does not exist the
    /// current membership stays untouched.
    pub async fn replace(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), SyncError<E>> {
        async {
            self.validate_owner(relation, owner, cancel).await?;
            if !members.is_empty() {
                self.validate_members(relation, members, cancel).await?;
            }

            let changeset = self
                .mutate(cancel, async |store| {
                    let changeset = store
                        .replace_members(relation, owner, members)
                        .await
                        .map_err(SyncError::Storage)?;
                    ensure_resolved(relation, owner, changeset)
                })
                .await?;

            debug!(
                added = ?changeset.added,
                removed = ?changeset.removed,
                "replaced members"
            );
            self.publish(relation, owner, changeset);
            Ok::<_, SyncError<E>>(())
        }
        .instrument(debug_span!("replace", %relation, owner))
        .await
    }

    /// Remove every association an entity takes part in.
    ///
    /// Needs to be called before an entity gets deleted for good. The entity itself does not need
    /// to exist anymore, this allows cleaning up after soft-deletions.
    pub async fn detach_entity(
        &self,
        kind: EntityKind,
        id: EntityId,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError<E>> {
        async {
            let detached = self
                .mutate(cancel, async |store| {
                    store
                        .detach_entity(kind, id)
                        .await
                        .map_err(SyncError::Storage)
                })
                .await?;

            debug!(owners = detached.len(), "detached entity");
            for entry in detached {
                self.audit.emit(AuditEvent {
                    relation: entry.relation,
                    owner: entry.owner,
                    added: Vec::new(),
                    removed: entry.removed,
                });
            }
            Ok::<_, SyncError<E>>(())
        }
        .instrument(debug_span!("detach", %kind, id))
        .await
    }

    /// Returns `true` if the entity exists and is not deleted.
    pub async fn exists(&self, kind: EntityKind, id: EntityId) -> Result<bool, SyncError<E>> {
        let check = self
            .validator
            .validate_exist(kind, &[id])
            .await
            .map_err(SyncError::Storage)?;
        Ok(check.all_found())
    }

    /// Current members of an owner.
    pub async fn list_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
    ) -> Result<Vec<EntityId>, SyncError<E>> {
        self.store
            .list_members(relation, owner)
            .await
            .map_err(SyncError::Storage)
    }

    /// Current owners a member is associated with.
    pub async fn list_owners(
        &self,
        relation: RelationKind,
        member: EntityId,
    ) -> Result<Vec<EntityId>, SyncError<E>> {
        self.store
            .list_owners(relation, member)
            .await
            .map_err(SyncError::Storage)
    }

    async fn validate_owner(
        &self,
        relation: RelationKind,
        owner: EntityId,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError<E>> {
        let kind = relation.owner_kind();
        let check = cancellable(cancel, async {
            self.validator
                .validate_exist(kind, &[owner])
                .await
                .map_err(SyncError::Storage)
        })
        .await?;

        if !check.all_found() {
            debug!("owner not found");
            return Err(SyncError::OwnerNotFound { kind, id: owner });
        }

        Ok(())
    }

    async fn validate_members(
        &self,
        relation: RelationKind,
        members: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), SyncError<E>> {
        let kind = relation.member_kind();
        let check = cancellable(cancel, async {
            self.validator
                .validate_exist(kind, members)
                .await
                .map_err(SyncError::Storage)
        })
        .await?;

        if !check.all_found() {
            debug!(missing = ?check.missing, "members not found");
            return Err(SyncError::MembersNotFound {
                kind,
                missing: check.missing,
            });
        }

        Ok(())
    }

    /// Run the mutating phase inside one transaction.
    ///
    /// Commits when `work` succeeds. Rolls back when it fails, the token gets cancelled or the
    /// configured timeout elapses. A failing rollback is logged, the original error is returned.
    async fn mutate<F, R>(&self, cancel: &CancellationToken, work: F) -> Result<R, SyncError<E>>
    where
        F: AsyncFnOnce(&S) -> Result<R, SyncError<E>>,
    {
        let permit = cancellable(cancel, async {
            self.store.begin().await.map_err(SyncError::Storage)
        })
        .await?;

        let timeout = self.config.operation_timeout;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("operation cancelled, rolling back");
                Err(SyncError::Cancelled)
            }
            _ = async {
                match timeout {
                    Some(timeout) => tokio::time::sleep(timeout).await,
                    None => std::future::pending().await,
                }
            } => {
                warn!(?timeout, "operation timed out, rolling back");
                Err(SyncError::Cancelled)
            }
            result = work(&self.store) => result,
        };

        match result {
            Ok(value) => {
                self.store
                    .commit(permit)
                    .await
                    .map_err(SyncError::Storage)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.store.rollback(permit).await {
                    warn!("rollback failed after '{err}': {rollback_err}");
                }
                Err(err)
            }
        }
    }

    fn publish(&self, relation: RelationKind, owner: EntityId, changeset: Changeset) {
        if changeset.is_empty() {
            return;
        }

        self.audit.emit(AuditEvent {
            relation,
            owner,
            added: changeset.added,
            removed: changeset.removed,
        });
    }
}

/// Turn a short write into an error.
///
/// Every member passed validation before the transaction began. Members reported as unresolved
/// by the store were deleted in the meantime, the whole operation has to fail.
fn ensure_resolved<E>(
    relation: RelationKind,
    owner: EntityId,
    changeset: Changeset,
) -> Result<Changeset, SyncError<E>>
where
    E: Error,
{
    if changeset.unresolved.is_empty() {
        return Ok(changeset);
    }

    warn!(
        unresolved = ?changeset.unresolved,
        "entities vanished between validation and write"
    );
    Err(SyncError::Inconsistent {
        relation,
        owner,
        kind: relation.member_kind(),
        unresolved: changeset.unresolved,
    })
}

/// Abort waiting for `fut` when the token gets cancelled.
async fn cancellable<F, R, E>(cancel: &CancellationToken, fut: F) -> Result<R, SyncError<E>>
where
    F: Future<Output = Result<R, SyncError<E>>>,
    E: Error,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        result = fut => result,
    }
}
