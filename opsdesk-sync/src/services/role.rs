// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use opsdesk_store::{AssociationStore, EntityId, EntityKind, EntityStore, RelationKind, Transaction};
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditSink, NoopAuditSink};
use crate::services::ServiceError;
use crate::synchronizer::Synchronizer;

/// Manages which permissions are granted to a role.
#[derive(Clone, Debug)]
pub struct RoleService<S, A = NoopAuditSink> {
    sync: Synchronizer<S, A>,
}

impl<S, A, E> RoleService<S, A>
where
    S: Transaction<Error = E> + EntityStore<Error = E> + AssociationStore<Error = E>,
    A: AuditSink,
    E: Error,
{
    pub fn new(sync: Synchronizer<S, A>) -> Self {
        Self { sync }
    }

    pub async fn grant_permissions(
        &self,
        role: EntityId,
        permissions: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .add(RelationKind::RolePermission, role, permissions, cancel)
            .await?;
        Ok(())
    }

    pub async fn revoke_permissions(
        &self,
        role: EntityId,
        permissions: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .remove(RelationKind::RolePermission, role, permissions, cancel)
            .await?;
        Ok(())
    }

    /// Replace all permissions of a role, an empty list revokes everything.
    pub async fn set_permissions(
        &self,
        role: EntityId,
        permissions: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .replace(RelationKind::RolePermission, role, permissions, cancel)
            .await?;
        Ok(())
    }

    pub async fn permissions(&self, role: EntityId) -> Result<Vec<EntityId>, ServiceError<E>> {
        if !self.sync.exists(EntityKind::Role, role).await? {
            return Err(ServiceError::NotFound {
                entity: EntityKind::Role,
                id: role,
            });
        }
        Ok(self
            .sync
            .list_members(RelationKind::RolePermission, role)
            .await?)
    }

    /// Remove the role from all users and revoke all its permissions.
    pub async fn detach(
        &self,
        role: EntityId,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .detach_entity(EntityKind::Role, role, cancel)
            .await?;
        Ok(())
    }
}
