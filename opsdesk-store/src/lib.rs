// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for entity lookups and many-to-many associations of the opsdesk platform.
//!
//! Associations (user ↔ role, role ↔ permission, responsibility group ↔ user) are kept in one join
//! relation per [`RelationKind`]. Writes to these relations are only ever done inside a
//! transaction which was explicitly started through the [`Transaction`] provider, reads of the
//! committed state can happen anytime.
//!
//! ```text
//! begin ---> insert_members ---> replace_members ---> commit
//!        \
//!         `--> (any error) ---> rollback
//! ```
//!
//! Two backends are provided: [`SqliteStore`](sqlite::SqliteStore) for persistent storage and
//! [`MemoryStore`](memory::MemoryStore) for development and tests. Both strictly serialise write
//! transactions and offer the same isolation: reads outside of a transaction only ever observe
//! committed state.
pub mod associations;
pub mod entities;
pub mod kinds;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test_utils"))]
mod test_utils;
pub mod traits;

pub use associations::{AssociationStore, Changeset, Detached};
pub use entities::EntityStore;
pub use kinds::{EntityId, EntityKind, RelationKind};
#[cfg(feature = "memory")]
pub use memory::{MemoryError, MemoryStore};
#[cfg(feature = "sqlite")]
pub use sqlite::{DatabaseConfig, SqliteError, SqliteStore, SqliteStoreBuilder};
pub use traits::Transaction;
