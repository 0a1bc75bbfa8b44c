// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

/// Database transaction provider.
///
/// All writes to entity tables and association relations happen inside a transaction started
/// with `begin`. The returned permit has to be handed back to either `commit` or `rollback`; it
/// doesn't protect from misuse but makes "holding" a transaction explicit.
///
/// Implementations strictly serialise transactions: a second `begin` waits until the permit of
/// the first one was returned.
pub trait Transaction {
    type Error: Error;

    type Permit;

    /// Begins a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Permit, Self::Error>>;

    /// Rolls back the transaction and with that all uncommitted changes.
    fn rollback(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;

    /// Commits the transaction.
    fn commit(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;
}
