// SPDX-License-Identifier: MIT OR Apache-2.0

//! `AssociationStore` trait for managing many-to-many join relations between an owner entity and
//! its members, with `SqliteStore` and `MemoryStore` implementations.
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(test)]
mod tests;
mod traits;

pub use traits::{AssociationStore, Changeset, Detached};
