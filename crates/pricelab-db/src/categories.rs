//! Database operations for the `categories` table.
//!
//! Categories keep their upstream ids as primary keys, so reconciliation is
//! keyed directly on `id`. `parent_id` is stored as delivered even when the
//! parent row does not exist yet; a later sync pass fills the gap.

use std::collections::HashSet;

use serde::Serialize;
use sqlx::PgPool;

use pricelab_core::CategoryRecord;

use crate::DbError;

/// A row from the `categories` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub catalog_id: i64,
    pub leaf: bool,
}

/// Outcome of one category reconciliation pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CategoryReconcileStats {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
}

/// Reconciles one catalog's category tree against the delivered records.
///
/// Existing rows (matched on the upstream id) are updated in place, new rows
/// are inserted. Runs inside a single transaction: either the whole tree
/// lands or none of it does.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn reconcile_categories(
    pool: &PgPool,
    catalog_id: i64,
    records: &[CategoryRecord],
) -> Result<CategoryReconcileStats, DbError> {
    let mut tx = pool.begin().await?;

    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    let existing: HashSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();

    let mut stats = CategoryReconcileStats {
        total: records.len(),
        ..CategoryReconcileStats::default()
    };

    for record in records {
        if existing.contains(&record.id) {
            sqlx::query(
                "UPDATE categories SET \
                     name = $2, parent_id = $3, catalog_id = $4, leaf = $5 \
                 WHERE id = $1",
            )
            .bind(record.id)
            .bind(&record.name)
            .bind(record.parent_id)
            .bind(catalog_id)
            .bind(record.leaf)
            .execute(&mut *tx)
            .await?;
            stats.updated += 1;
        } else {
            sqlx::query(
                "INSERT INTO categories (id, name, parent_id, catalog_id, leaf) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(record.id)
            .bind(&record.name)
            .bind(record.parent_id)
            .bind(catalog_id)
            .bind(record.leaf)
            .execute(&mut *tx)
            .await?;
            stats.created += 1;
        }
    }

    tx.commit().await?;
    Ok(stats)
}

/// Lists every category of one catalog, ordered by upstream id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories_by_catalog(
    pool: &PgPool,
    catalog_id: i64,
) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, parent_id, catalog_id, leaf \
         FROM categories WHERE catalog_id = $1 ORDER BY id",
    )
    .bind(catalog_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
