// SPDX-License-Identifier: MIT OR Apache-2.0

use sqlx::{QueryBuilder, Sqlite, query, query_scalar};

use crate::entities::EntityStore;
use crate::kinds::{EntityId, EntityKind};
use crate::sqlite::{SqliteError, SqliteStore};

/// Identifiers bound in one lookup, SQLite limits the number of variables per statement to 32766.
const MAX_BOUND_IDS: usize = 10_000;

impl<'a> EntityStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn insert_entity(&self, kind: EntityKind, name: &str) -> Result<EntityId, SqliteError> {
        self.tx(async |tx| {
            let sql = format!("INSERT INTO {} (name) VALUES (?) RETURNING id", kind.table());
            query_scalar::<_, EntityId>(&sql)
                .bind(name)
                .fetch_one(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
        })
        .await
    }

    async fn soft_delete_entity(&self, kind: EntityKind, id: EntityId) -> Result<bool, SqliteError> {
        let result = self
            .tx(async |tx| {
                let sql = format!(
                    "
                    UPDATE
                        {}
                    SET
                        deleted_at = CAST(strftime('%s', 'now') AS INTEGER)
                    WHERE
                        id = ?
                        AND deleted_at IS NULL
                    ",
                    kind.table()
                );
                query(&sql)
                    .bind(id)
                    .execute(&mut **tx)
                    .await
                    .map_err(SqliteError::Sqlite)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn existing_entities(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<EntityId>, SqliteError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.execute(async |pool| {
            let mut found = Vec::with_capacity(ids.len());
            for chunk in ids.chunks(MAX_BOUND_IDS) {
                let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                    "SELECT id FROM {} WHERE deleted_at IS NULL AND id IN (",
                    kind.table()
                ));
                let mut separated = builder.separated(", ");
                for id in chunk {
                    separated.push_bind(*id);
                }
                separated.push_unseparated(")");

                found.extend(
                    builder
                        .build_query_scalar::<EntityId>()
                        .fetch_all(pool)
                        .await?,
                );
            }

            found.sort_unstable();
            found.dedup();
            Ok(found)
        })
        .await
    }
}
