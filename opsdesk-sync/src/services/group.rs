// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use opsdesk_store::{AssociationStore, EntityId, EntityKind, EntityStore, RelationKind, Transaction};
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditSink, NoopAuditSink};
use crate::services::ServiceError;
use crate::synchronizer::Synchronizer;

/// Manages the users which are members of a responsibility group.
#[derive(Clone, Debug)]
pub struct ResponsibilityGroupService<S, A = NoopAuditSink> {
    sync: Synchronizer<S, A>,
}

impl<S, A, E> ResponsibilityGroupService<S, A>
where
    S: Transaction<Error = E> + EntityStore<Error = E> + AssociationStore<Error = E>,
    A: AuditSink,
    E: Error,
{
    pub fn new(sync: Synchronizer<S, A>) -> Self {
        Self { sync }
    }

    pub async fn add_members(
        &self,
        group: EntityId,
        users: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .add(RelationKind::GroupMember, group, users, cancel)
            .await?;
        Ok(())
    }

    pub async fn remove_members(
        &self,
        group: EntityId,
        users: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .remove(RelationKind::GroupMember, group, users, cancel)
            .await?;
        Ok(())
    }

    pub async fn set_members(
        &self,
        group: EntityId,
        users: &[EntityId],
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .replace(RelationKind::GroupMember, group, users, cancel)
            .await?;
        Ok(())
    }

    pub async fn members(&self, group: EntityId) -> Result<Vec<EntityId>, ServiceError<E>> {
        if !self.sync.exists(EntityKind::Group, group).await? {
            return Err(ServiceError::NotFound {
                entity: EntityKind::Group,
                id: group,
            });
        }
        Ok(self
            .sync
            .list_members(RelationKind::GroupMember, group)
            .await?)
    }

    /// Groups a user is a member of.
    pub async fn groups_of(&self, user: EntityId) -> Result<Vec<EntityId>, ServiceError<E>> {
        if !self.sync.exists(EntityKind::User, user).await? {
            return Err(ServiceError::NotFound {
                entity: EntityKind::User,
                id: user,
            });
        }
        Ok(self
            .sync
            .list_owners(RelationKind::GroupMember, user)
            .await?)
    }

    pub async fn detach(
        &self,
        group: EntityId,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError<E>> {
        self.sync
            .detach_entity(EntityKind::Group, group, cancel)
            .await?;
        Ok(())
    }
}
