// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feature-facing services on top of the synchronizer.
//!
//! Each service manages exactly one relationship and reports failures as [`ServiceError`], which
//! carries everything a transport layer needs to answer a request (see
//! [`ServiceError::status_code`]).
use std::error::Error;

use opsdesk_store::{EntityId, EntityKind};
use thiserror::Error;

use crate::error::SyncError;

mod group;
mod role;
mod user;

pub use group::ResponsibilityGroupService;
pub use role::RoleService;
pub use user::UserService;

#[derive(Debug, Error)]
pub enum ServiceError<E>
where
    E: Error,
{
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: EntityId },

    /// Request referenced entities which don't exist, listing all of them so the request can be
    /// corrected in one go.
    #[error("unknown {entity} references: {ids:?}")]
    MissingReferences {
        entity: EntityKind,
        ids: Vec<EntityId>,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("request was cancelled before it completed")]
    Unavailable,

    #[error("internal error: {0}")]
    Internal(#[source] E),
}

impl<E> ServiceError<E>
where
    E: Error,
{
    /// HTTP status code equivalent of this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound { .. } | ServiceError::MissingReferences { .. } => 404,
            ServiceError::Conflict(_) => 409,
            ServiceError::Unavailable => 503,
            ServiceError::Internal(_) => 500,
        }
    }
}

impl<E> From<SyncError<E>> for ServiceError<E>
where
    E: Error,
{
    fn from(err: SyncError<E>) -> Self {
        match err {
            err @ SyncError::InvalidInput { .. } => ServiceError::BadRequest(err.to_string()),
            SyncError::OwnerNotFound { kind, id } => ServiceError::NotFound { entity: kind, id },
            SyncError::MembersNotFound { kind, missing } => ServiceError::MissingReferences {
                entity: kind,
                ids: missing,
            },
            SyncError::Inconsistent {
                kind, unresolved, ..
            } => ServiceError::MissingReferences {
                entity: kind,
                ids: unresolved,
            },
            err @ SyncError::Conflict { .. } => ServiceError::Conflict(err.to_string()),
            SyncError::Cancelled => ServiceError::Unavailable,
            SyncError::Storage(err) => ServiceError::Internal(err),
        }
    }
}
