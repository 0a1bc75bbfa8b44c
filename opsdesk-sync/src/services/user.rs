// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;
use std::error::Error;

use opsdesk_store::{AssociationStore, EntityId, EntityKind, EntityStore, RelationKind, Transaction};
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditSink, NoopAuditSink};
use crate::services::ServiceError;
use crate::synchronizer::Synchronizer;

/// Manages the roles assigned to a user and resolves the permissions a user holds through them.
#[derive(Clone, Debug)]
pub struct UserService<S, A = NoopAuditSink> {
    sync: Synchronizer<S, A>,
}

impl<S, A, E> UserService<S, A>
where
    S: Transaction<Error = E> + EntityStore<Error = E> + AssociationStore<Error = E>,
    A: AuditSink,
    E: Error,
{
    pub fn new(sync: Synchronizer<S, A>) -> Self {
        Self { sync }
    }

    pub async fn assign_roles(
        &self,
        user: EntityId,
        roles: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .add(RelationKind::UserRole, user, roles, cancel)
            .await?;
        Ok(())
    }

    pub async fn unassign_roles(
        &self,
        user: EntityId,
        roles: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .remove(RelationKind::UserRole, user, roles, cancel)
            .await?;
        Ok(())
    }

    pub async fn set_roles(
        &self,
        user: EntityId,
        roles: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .replace(RelationKind::UserRole, user, roles, cancel)
            .await?;
        Ok(())
    }

    pub async fn roles(&self, user: EntityId) -> Result<Vec<EntityId>, ServiceError<E>> {
        self.ensure_user(user).await?;
        Ok(self.sync.list_members(RelationKind::UserRole, user).await?)
    }

    /// All permissions granted to any of the user's roles, sorted and without duplicates.
    ///
    /// Reads are not isolated from concurrent writes, a permission granted or revoked while this
    /// runs may or may not be part of the result.
    pub async fn effective_permissions(
        &self,
        user: EntityId,
    ) -> Result<Vec<EntityId>, ServiceError<E>> {
        let mut permissions = BTreeSet::new();
        for role in self.roles(user).await? {
            permissions.extend(
                self.sync
                    .list_members(RelationKind::RolePermission, role)
                    .await?,
            );
        }
        Ok(permissions.into_iter().collect())
    }

    pub async fn has_permission(
        &self,
        user: EntityId,
        permission: EntityId,
    ) -> Result<bool, ServiceError<E>> {
        Ok(self
            .effective_permissions(user)
            .await?
            .binary_search(&permission)
            .is_ok())
    }

    /// Remove the user from all roles and responsibility groups.
    pub async fn detach(
        &self,
        user: EntityId,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .detach_entity(EntityKind::User, user, cancel)
            .await?;
        Ok(())
    }

    async fn ensure_user(&self, user: EntityId) -> Result<(), ServiceError<E>> {
        if !self.sync.exists(EntityKind::User, user).await? {
            return Err(ServiceError::NotFound {
                entity: EntityKind::User,
                id: user,
            });
        }
        Ok(())
    }
}
