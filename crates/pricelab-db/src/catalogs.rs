//! Database operations for the `catalogs` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `catalogs` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CatalogRow {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Returns the id of the catalog with this name, inserting it when absent.
///
/// The no-op `DO UPDATE` on conflict makes `RETURNING id` yield the existing
/// row's id instead of nothing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn get_or_create_catalog(pool: &PgPool, name: &str) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO catalogs (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Lists all catalogs, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_catalogs(pool: &PgPool) -> Result<Vec<CatalogRow>, DbError> {
    let rows = sqlx::query_as::<_, CatalogRow>(
        "SELECT id, name, created_at FROM catalogs ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
