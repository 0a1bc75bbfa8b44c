// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;
use std::error::Error;

use crate::kinds::{EntityId, EntityKind, RelationKind};

/// Effect of a write to a join relation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changeset {
    /// Members which were newly associated with the owner.
    pub added: Vec<EntityId>,

    /// Members which were disassociated from the owner.
    pub removed: Vec<EntityId>,

    /// Members which should have been associated but were left out because the owner or the
    /// member entity does not exist (anymore) at the time of the write.
    pub unresolved: Vec<EntityId>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Associations of one owner which were removed when detaching an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detached {
    pub relation: RelationKind,
    pub owner: EntityId,
    pub removed: Vec<EntityId>,
}

/// Interface for writing and querying (owner, member) pairs of a join relation.
///
/// Every pair is unique within its `RelationKind`. Writes need to be called within a transaction
/// and never manage transactions themselves, reads only observe committed state.
pub trait AssociationStore {
    type Error: Error;

    /// Associate the given members with an owner.
    ///
    /// Inserting an already present pair is a no-op. A pair is only inserted when both the owner
    /// and the member exist, otherwise the member is reported as `unresolved`.
    fn insert_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> impl Future<Output = Result<Changeset, Self::Error>>;

    /// Disassociate the given members from an owner.
    ///
    /// Removing a pair which does not exist is not an error, `removed` only lists the pairs which
    /// actually disappeared.
    fn delete_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> impl Future<Output = Result<Changeset, Self::Error>>;

    /// Make the given set the complete membership of an owner.
    ///
    /// Only the difference to the current membership is written: members which are not part of
    /// the new set are removed, new members are inserted and stable members stay untouched.
    fn replace_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> impl Future<Output = Result<Changeset, Self::Error>>;

    /// Remove every association an entity takes part in, either as an owner or as a member.
    fn detach_entity(
        &self,
        kind: EntityKind,
        id: EntityId,
    ) -> impl Future<Output = Result<Vec<Detached>, Self::Error>>;

    /// Current members of an owner, sorted. Soft-deleted members are left out.
    fn list_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
    ) -> impl Future<Output = Result<Vec<EntityId>, Self::Error>>;

    /// Current owners of a member, sorted. Soft-deleted owners are left out.
    fn list_owners(
        &self,
        relation: RelationKind,
        member: EntityId,
    ) -> impl Future<Output = Result<Vec<EntityId>, Self::Error>>;
}

/// Sorted set of identifiers without duplicates.
pub(crate) fn unique(ids: &[EntityId]) -> BTreeSet<EntityId> {
    ids.iter().copied().collect()
}
