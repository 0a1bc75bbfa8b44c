// SPDX-License-Identifier: MIT OR Apache-2.0

//! `EntityStore` trait for creating, soft-deleting and looking up platform entities.
#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(test)]
mod tests;
mod traits;

pub use traits::EntityStore;
