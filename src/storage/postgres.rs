// src/storage/postgres.rs
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

use crate::domain::{FieldFilter, FilterOp};

use super::traits::{Document, DocumentStore, StoreError, WriteBatch, WriteOp};

/// PostgreSQL implementation of the DocumentStore trait.
///
/// Every document is one row of `documents`, keyed by `(collection, id)`,
/// with its body in a JSONB column. Filters compare `data ->> field` as text.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgresStore instance with a connection pool.
    pub async fn connect(
        database_url: &str,
        min_connections: u32,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn sql_operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => " = ",
        FilterOp::NotEq => " <> ",
        FilterOp::Lt => " < ",
        FilterOp::Lte => " <= ",
        FilterOp::Gt => " > ",
        FilterOp::Gte => " >= ",
    }
}

/// Build the SELECT for a filtered query. Field names are bound, never spliced.
///
/// Range comparisons use the "C" collation so they order by bytes, matching
/// `str` ordering in the in-memory store regardless of the database locale.
fn build_query<'a>(collection: &'a str, filters: &'a [FieldFilter]) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
    builder.push_bind(collection);

    for filter in filters {
        builder
            .push(" AND (data ->> ")
            .push_bind(filter.field.as_str())
            .push(")");
        if !matches!(filter.op, FilterOp::Eq | FilterOp::NotEq) {
            builder.push(" COLLATE \"C\"");
        }
        builder
            .push(sql_operator(filter.op))
            .push_bind(filter.value.as_str());
    }

    builder
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, StoreError> {
        let rows = build_query(collection, filters)
            .build()
            .fetch_all(&self.pool)
            .await?;

        let docs = rows
            .into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let data: serde_json::Value = row.get("data");
                Document::new(id, data)
            })
            .collect::<Vec<_>>();

        debug!(collection, count = docs.len(), "Fetched documents");
        Ok(docs)
    }

    async fn set(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET
                data = EXCLUDED.data,
                updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(&doc.id)
        .bind(&doc.data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn commit(&self, collection: &str, batch: WriteBatch) -> Result<(), StoreError> {
        // Start a transaction; dropping it without commit rolls back
        let mut tx = self.pool.begin().await?;

        for op in batch.ops() {
            match op {
                WriteOp::Set(doc) => {
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, data)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (collection, id)
                        DO UPDATE SET
                            data = EXCLUDED.data,
                            updated_at = now()
                        "#,
                    )
                    .bind(collection)
                    .bind(&doc.id)
                    .bind(&doc.data)
                    .execute(&mut *tx)
                    .await?;
                }
                WriteOp::Delete(id) => {
                    sqlx::query(
                        r#"
                        DELETE FROM documents
                        WHERE collection = $1 AND id = $2
                        "#,
                    )
                    .bind(collection)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        // Commit the transaction
        tx.commit().await?;

        debug!(collection, ops = batch.len(), "Committed batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_without_filters() {
        let builder = build_query("casbin", &[]);
        assert_eq!(
            builder.sql(),
            "SELECT id, data FROM documents WHERE collection = $1"
        );
    }

    #[test]
    fn test_build_query_binds_fields() {
        let filters = vec![
            FieldFilter::eq("ptype", "p"),
            FieldFilter::new("v1", FilterOp::Gte, "data2"),
        ];
        let builder = build_query("casbin", &filters);

        assert_eq!(
            builder.sql(),
            "SELECT id, data FROM documents WHERE collection = $1 \
             AND (data ->> $2) = $3 AND (data ->> $4) COLLATE \"C\" >= $5"
        );
    }

    #[test]
    fn test_build_query_range_ops_use_byte_order() {
        let filters = vec![
            FieldFilter::new("v0", FilterOp::Lt, "m"),
            FieldFilter::new("v1", FilterOp::NotEq, "x"),
            FieldFilter::new("v2", FilterOp::Gt, "a"),
        ];
        let builder = build_query("casbin", &filters);

        assert_eq!(
            builder.sql(),
            "SELECT id, data FROM documents WHERE collection = $1 \
             AND (data ->> $2) COLLATE \"C\" < $3 \
             AND (data ->> $4) <> $5 \
             AND (data ->> $6) COLLATE \"C\" > $7"
        );
    }
}
