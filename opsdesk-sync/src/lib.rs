// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional synchronisation of many-to-many relationships between platform entities.
//!
//! Three relationships exist on the platform: roles assigned to users, permissions granted to
//! roles and users being members of responsibility groups. All of them are managed through one
//! [`Synchronizer`], parameterised by a [`RelationKind`]:
//!
//! ```text
//! façade ---> validate owner ---> validate members ---> begin ---> write ---> commit ---> audit
//!                  |                    |                            |
//!                  v                    v                            v
//!            OwnerNotFound       MembersNotFound               rollback + error
//! ```
//!
//! Validation failures never open a transaction. Every write happens inside exactly one
//! transaction, so callers either observe the complete effect of an operation or none of it.
//!
//! The feature-facing services ([`RoleService`](services::RoleService),
//! [`UserService`](services::UserService) and
//! [`ResponsibilityGroupService`](services::ResponsibilityGroupService)) wrap the synchronizer for
//! one relationship each and translate its errors into [`ServiceError`](services::ServiceError).
pub mod audit;
pub mod config;
pub mod error;
pub mod services;
mod synchronizer;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod validator;

pub use audit::{AuditEvent, AuditSink, BroadcastAuditSink, NoopAuditSink};
pub use config::SyncConfig;
pub use error::{ErrorKind, SyncError};
pub use opsdesk_store::{EntityId, EntityKind, RelationKind};
pub use synchronizer::Synchronizer;
pub use validator::{EntityExistenceValidator, ExistenceCheck};
