// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::associations::traits::unique;
use crate::associations::{AssociationStore, Changeset, Detached};
use crate::kinds::{EntityId, EntityKind, RelationKind};
use crate::memory::{MemoryError, MemoryStore, State};

fn insert_pairs(
    state: &mut State,
    relation: RelationKind,
    owner: EntityId,
    members: impl IntoIterator<Item = EntityId>,
    changeset: &mut Changeset,
) {
    let owner_live = state.is_live(relation.owner_kind(), owner);
    for member in members {
        if !owner_live || !state.is_live(relation.member_kind(), member) {
            changeset.unresolved.push(member);
            continue;
        }

        let pairs = state.associations.entry(relation).or_default();
        if pairs.insert((owner, member)) {
            changeset.added.push(member);
        }
    }
}

fn remove_pairs(
    state: &mut State,
    relation: RelationKind,
    owner: EntityId,
    members: impl IntoIterator<Item = EntityId>,
    changeset: &mut Changeset,
) {
    let pairs = state.associations.entry(relation).or_default();
    for member in members {
        if pairs.remove(&(owner, member)) {
            changeset.removed.push(member);
        }
    }
}

fn members_of(state: &State, relation: RelationKind, owner: EntityId) -> Vec<EntityId> {
    state
        .pairs(relation)
        .filter(|(pair_owner, _)| *pair_owner == owner)
        .map(|(_, member)| *member)
        .collect()
}

impl AssociationStore for MemoryStore {
    type Error = MemoryError;

    async fn insert_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> Result<Changeset, MemoryError> {
        self.tx(|state| {
            let mut changeset = Changeset::default();
            insert_pairs(state, relation, owner, unique(members), &mut changeset);
            Ok(changeset)
        })
        .await
    }

    async fn delete_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> Result<Changeset, MemoryError> {
        self.tx(|state| {
            let mut changeset = Changeset::default();
            remove_pairs(state, relation, owner, unique(members), &mut changeset);
            Ok(changeset)
        })
        .await
    }

    async fn replace_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> Result<Changeset, MemoryError> {
        self.tx(|state| {
            let current = unique(&members_of(state, relation, owner));
            let desired = unique(members);

            let mut changeset = Changeset::default();
            remove_pairs(
                state,
                relation,
                owner,
                current.difference(&desired).copied(),
                &mut changeset,
            );
            insert_pairs(
                state,
                relation,
                owner,
                desired.difference(&current).copied(),
                &mut changeset,
            );
            Ok(changeset)
        })
        .await
    }

    async fn detach_entity(
        &self,
        kind: EntityKind,
        id: EntityId,
    ) -> Result<Vec<Detached>, MemoryError> {
        self.tx(|state| {
            let mut detached = Vec::new();

            for relation in RelationKind::ALL {
                let Some(pairs) = state.associations.get_mut(&relation) else {
                    continue;
                };

                if relation.owner_kind() == kind {
                    let removed: Vec<EntityId> = pairs
                        .iter()
                        .filter(|(owner, _)| *owner == id)
                        .map(|(_, member)| *member)
                        .collect();
                    pairs.retain(|(owner, _)| *owner != id);
                    if !removed.is_empty() {
                        detached.push(Detached {
                            relation,
                            owner: id,
                            removed,
                        });
                    }
                }

                if relation.member_kind() == kind {
                    let owners: Vec<EntityId> = pairs
                        .iter()
                        .filter(|(_, member)| *member == id)
                        .map(|(owner, _)| *owner)
                        .collect();
                    pairs.retain(|(_, member)| *member != id);
                    detached.extend(owners.into_iter().map(|owner| Detached {
                        relation,
                        owner,
                        removed: vec![id],
                    }));
                }
            }

            Ok(detached)
        })
        .await
    }

    async fn list_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
    ) -> Result<Vec<EntityId>, MemoryError> {
        let member_kind = relation.member_kind();
        Ok(self
            .read(|state| {
                members_of(state, relation, owner)
                    .into_iter()
                    .filter(|member| state.is_live(member_kind, *member))
                    .collect()
            })
            .await)
    }

    async fn list_owners(
        &self,
        relation: RelationKind,
        member: EntityId,
    ) -> Result<Vec<EntityId>, MemoryError> {
        let owner_kind = relation.owner_kind();
        let mut owners: Vec<EntityId> = self
            .read(|state| {
                state
                    .pairs(relation)
                    .filter(|(_, pair_member)| *pair_member == member)
                    .map(|(owner, _)| *owner)
                    .filter(|owner| state.is_live(owner_kind, *owner))
                    .collect()
            })
            .await;
        owners.sort_unstable();
        Ok(owners)
    }
}
