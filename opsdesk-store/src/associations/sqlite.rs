// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use sqlx::{query, query_as, query_scalar};

use crate::associations::traits::unique;
use crate::associations::{AssociationStore, Changeset, Detached};
use crate::kinds::{EntityId, EntityKind, RelationKind};
use crate::sqlite::{SqliteError, SqliteStore, Transaction};

/// Insert pairs, but only if both sides resolve to existing entities.
///
/// `INSERT OR IGNORE` makes re-inserting a present pair a no-op. When nothing was inserted we
/// check if that was because of an existing pair or because one side doesn't resolve anymore.
async fn insert_pairs(
    tx: &mut Transaction<'_>,
    relation: RelationKind,
    owner: EntityId,
    members: impl IntoIterator<Item = EntityId>,
    changeset: &mut Changeset,
) -> Result<(), SqliteError> {
    let insert = format!(
        "
        INSERT OR IGNORE
        INTO
            {relation_table} (
                owner_id,
                member_id
            )
        SELECT
            owners.id,
            members.id
        FROM
            {owner_table} AS owners,
            {member_table} AS members
        WHERE
            owners.id = ?
            AND owners.deleted_at IS NULL
            AND members.id = ?
            AND members.deleted_at IS NULL
        ",
        relation_table = relation.table(),
        owner_table = relation.owner_kind().table(),
        member_table = relation.member_kind().table(),
    );

    let resolves = format!(
        "
        SELECT
            COUNT(*)
        FROM
            {owner_table} AS owners,
            {member_table} AS members
        WHERE
            owners.id = ?
            AND owners.deleted_at IS NULL
            AND members.id = ?
            AND members.deleted_at IS NULL
        ",
        owner_table = relation.owner_kind().table(),
        member_table = relation.member_kind().table(),
    );

    for member in members {
        let result = query(&insert)
            .bind(owner)
            .bind(member)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() > 0 {
            changeset.added.push(member);
            continue;
        }

        let count: i64 = query_scalar(&resolves)
            .bind(owner)
            .bind(member)
            .fetch_one(&mut **tx)
            .await?;
        if count == 0 {
            changeset.unresolved.push(member);
        }
    }

    Ok(())
}

async fn remove_pairs(
    tx: &mut Transaction<'_>,
    relation: RelationKind,
    owner: EntityId,
    members: impl IntoIterator<Item = EntityId>,
    changeset: &mut Changeset,
) -> Result<(), SqliteError> {
    let delete = format!(
        "
        DELETE FROM
            {}
        WHERE
            owner_id = ?
            AND member_id = ?
        ",
        relation.table()
    );

    for member in members {
        let result = query(&delete)
            .bind(owner)
            .bind(member)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() > 0 {
            changeset.removed.push(member);
        }
    }

    Ok(())
}

impl<'a> AssociationStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn insert_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> Result<Changeset, SqliteError> {
        self.tx(async |tx| {
            let mut changeset = Changeset::default();
            insert_pairs(tx, relation, owner, unique(members), &mut changeset).await?;
            Ok(changeset)
        })
        .await
    }

    async fn delete_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> Result<Changeset, SqliteError> {
        self.tx(async |tx| {
            let mut changeset = Changeset::default();
            remove_pairs(tx, relation, owner, unique(members), &mut changeset).await?;
            Ok(changeset)
        })
        .await
    }

    async fn replace_members(
        &self,
        relation: RelationKind,
        owner: EntityId,
        members: &[EntityId],
    ) -> Result<Changeset, SqliteError> {
        self.tx(async |tx| {
            // Read the current membership within the transaction, concurrent writers are
            // serialised by the transaction permit.
            let sql = format!(
                "SELECT member_id FROM {} WHERE owner_id = ?",
                relation.table()
            );
            let current: Vec<EntityId> = query_scalar(&sql)
                .bind(owner)
                .fetch_all(&mut **tx)
                .await?;

            let current = unique(&current);
            let desired = unique(members);

            let mut changeset = Changeset::default();
            remove_pairs(
                tx,
                relation,
                owner,
                current.difference(&desired).copied(),
                &mut changeset,
            )
            .await?;
            insert_pairs(
                tx,
                relation,
                owner,
                desired.difference(&current).copied(),
                &mut changeset,
            )
            .await?;
            Ok(changeset)
        })
        .await
    }

    async fn detach_entity(
        &self,
        kind: EntityKind,
        id: EntityId,
    ) -> Result<Vec<Detached>, SqliteError> {
        self.tx(async |tx| {
            let mut detached = Vec::new();

            for relation in RelationKind::ALL {
                if relation.owner_kind() == kind {
                    let sql = format!(
                        "DELETE FROM {} WHERE owner_id = ? RETURNING member_id",
                        relation.table()
                    );
                    let mut removed: Vec<EntityId> =
                        query_scalar(&sql).bind(id).fetch_all(&mut **tx).await?;
                    if !removed.is_empty() {
                        removed.sort_unstable();
                        detached.push(Detached {
                            relation,
                            owner: id,
                            removed,
                        });
                    }
                }

                if relation.member_kind() == kind {
                    let sql = format!(
                        "DELETE FROM {} WHERE member_id = ? RETURNING owner_id, member_id",
                        relation.table()
                    );
                    let rows: Vec<(EntityId, EntityId)> =
                        query_as(&sql).bind(id).fetch_all(&mut **tx).await?;

                    let mut by_owner: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();
                    for (owner, member) in rows {
                        by_owner.entry(owner).or_default().push(member);
                    }
                    detached.extend(by_owner.into_iter().map(|(owner, removed)| Detached {
                        relation,
                        owner,
                        removed,
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
    ) -> Result<Vec<EntityId>, SqliteError> {
        self.execute(async |pool| {
            let sql = format!(
                "
                SELECT
                    associations.member_id
                FROM
                    {relation_table} AS associations
                    JOIN {member_table} AS members ON members.id = associations.member_id
                WHERE
                    associations.owner_id = ?
                    AND members.deleted_at IS NULL
                ORDER BY
                    associations.member_id
                ",
                relation_table = relation.table(),
                member_table = relation.member_kind().table(),
            );
            query_scalar(&sql)
                .bind(owner)
                .fetch_all(pool)
                .await
                .map_err(SqliteError::Sqlite)
        })
        .await
    }

    async fn list_owners(
        &self,
        relation: RelationKind,
        member: EntityId,
    ) -> Result<Vec<EntityId>, SqliteError> {
        self.execute(async |pool| {
            let sql = format!(
                "
                SELECT
                    associations.owner_id
                FROM
                    {relation_table} AS associations
                    JOIN {owner_table} AS owners ON owners.id = associations.owner_id
                WHERE
                    associations.member_id = ?
                    AND owners.deleted_at IS NULL
                ORDER BY
                    associations.owner_id
                ",
                relation_table = relation.table(),
                owner_table = relation.owner_kind().table(),
            );
            query_scalar(&sql)
                .bind(member)
                .fetch_all(pool)
                .await
                .map_err(SqliteError::Sqlite)
        })
        .await
    }
}
