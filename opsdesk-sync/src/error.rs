// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use opsdesk_store::{EntityId, EntityKind, RelationKind};
use thiserror::Error;

/// Error kinds callers can branch on, independent of the storage backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request was malformed, for example an empty member set. Never retried.
    InvalidInput,

    /// Owner entity does not exist.
    OwnerNotFound,

    /// One or more member entities do not exist.
    MembersNotFound,

    /// Relation-specific rule violated.
    Conflict,

    /// Operation was cancelled or timed out before it committed.
    Cancelled,

    /// Transaction or query failed.
    Storage,
}

#[derive(Debug, Error)]
pub enum SyncError<E>
where
    E: Error,
{
    #[error("no members given for {relation} operation on owner {owner}")]
    InvalidInput {
        relation: RelationKind,
        owner: EntityId,
    },

    #[error("{kind} {id} not found")]
    OwnerNotFound { kind: EntityKind, id: EntityId },

    #[error("{kind} entities not found: {missing:?}")]
    MembersNotFound {
        kind: EntityKind,
        missing: Vec<EntityId>,
    },

    /// Reserved for cardinality or uniqueness rules beyond the (owner, member) pair.
    #[error("conflicting {relation} association for owner {owner}: {reason}")]
    Conflict {
        relation: RelationKind,
        owner: EntityId,
        reason: String,
    },

    /// Entities passed validation but didn't resolve anymore inside the transaction, someone
    /// deleted them in the meantime. The transaction was rolled back.
    #[error("{kind} entities {unresolved:?} vanished while writing {relation} of owner {owner}")]
    Inconsistent {
        relation: RelationKind,
        owner: EntityId,
        kind: EntityKind,
        unresolved: Vec<EntityId>,
    },

    #[error("operation was cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(#[source] E),
}

impl<E> SyncError<E>
where
    E: Error,
{
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::InvalidInput { .. } => ErrorKind::InvalidInput,
            SyncError::OwnerNotFound { .. } => ErrorKind::OwnerNotFound,
            SyncError::MembersNotFound { .. } => ErrorKind::MembersNotFound,
            SyncError::Conflict { .. } => ErrorKind::Conflict,
            // Callers react the same way as on missing members: correct the request and retry.
            SyncError::Inconsistent { .. } => ErrorKind::MembersNotFound,
            SyncError::Cancelled => ErrorKind::Cancelled,
            SyncError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Identifiers of the members which could not be found, if any.
    pub fn missing_members(&self) -> &[EntityId] {
        match self {
            SyncError::MembersNotFound { missing, .. } => missing,
            SyncError::Inconsistent { unresolved, .. } => unresolved,
            _ => &[],
        }
    }
}
