//! Database operations for the `products` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use pricelab_core::ProductRecord;

use crate::DbError;

/// A row from the `products` table. `id` is the local surrogate key;
/// `netlab_id` is the stable upstream identifier.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub netlab_id: i64,
    pub part_number: Option<String>,
    pub name: String,
    pub category_id: i64,
    pub available_kurskaya: f64,
    pub available_transit: f64,
    pub available_kaluzhskaya: f64,
    pub available_lobnenskaya: f64,
    pub price_category_a: f64,
    pub price_category_b: f64,
    pub price_category_c: f64,
    pub price_category_d: f64,
    pub price_category_e: f64,
    pub price_category_f: f64,
    pub price_category_n: f64,
    pub rrc: f64,
    pub volume: f64,
    pub weight: f64,
    pub guarantee: String,
    pub manufacturer: String,
    pub tax: Option<String>,
    pub is_discontinued: bool,
    pub is_deleted: bool,
    pub traceable_good: i32,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one product reconciliation pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProductReconcileStats {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
}

/// Distributor price tier to filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    A,
    B,
    C,
    D,
    E,
    F,
    N,
    Rrc,
}

impl PriceTier {
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::A => "price_category_a",
            Self::B => "price_category_b",
            Self::C => "price_category_c",
            Self::D => "price_category_d",
            Self::E => "price_category_e",
            Self::F => "price_category_f",
            Self::N => "price_category_n",
            Self::Rrc => "rrc",
        }
    }
}

/// Reconciles one category's products against the delivered records,
/// keyed on `netlab_id`.
///
/// The target category must already exist; products are never allowed to
/// dangle the way categories are. Runs inside a single transaction.
///
/// # Errors
///
/// - [`DbError::CategoryNotFound`] when `category_id` has no row.
/// - [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn reconcile_products(
    pool: &PgPool,
    category_id: i64,
    records: &[ProductRecord],
) -> Result<ProductReconcileStats, DbError> {
    let exists: bool =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(category_id)
            .fetch_one(pool)
            .await?;
    if !exists {
        return Err(DbError::CategoryNotFound { category_id });
    }

    let mut tx = pool.begin().await?;

    let netlab_ids: Vec<i64> = records.iter().map(|r| r.netlab_id).collect();
    let existing: HashSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT netlab_id FROM products WHERE netlab_id = ANY($1)")
            .bind(&netlab_ids)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();

    let mut stats = ProductReconcileStats {
        total: records.len(),
        ..ProductReconcileStats::default()
    };

    for record in records {
        if existing.contains(&record.netlab_id) {
            stats.updated += 1;
        } else {
            stats.created += 1;
        }
        // One statement serves both paths; the split above is only for stats.
        sqlx::query(
            "INSERT INTO products \
                 (netlab_id, part_number, name, category_id, \
                  available_kurskaya, available_transit, available_kaluzhskaya, available_lobnenskaya, \
                  price_category_a, price_category_b, price_category_c, price_category_d, \
                  price_category_e, price_category_f, price_category_n, rrc, \
                  volume, weight, guarantee, manufacturer, tax, \
                  is_discontinued, is_deleted, traceable_good) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
                     $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24) \
             ON CONFLICT (netlab_id) DO UPDATE SET \
                 part_number           = EXCLUDED.part_number, \
                 name                  = EXCLUDED.name, \
                 category_id           = EXCLUDED.category_id, \
                 available_kurskaya    = EXCLUDED.available_kurskaya, \
                 available_transit     = EXCLUDED.available_transit, \
                 available_kaluzhskaya = EXCLUDED.available_kaluzhskaya, \
                 available_lobnenskaya = EXCLUDED.available_lobnenskaya, \
                 price_category_a      = EXCLUDED.price_category_a, \
                 price_category_b      = EXCLUDED.price_category_b, \
                 price_category_c      = EXCLUDED.price_category_c, \
                 price_category_d      = EXCLUDED.price_category_d, \
                 price_category_e      = EXCLUDED.price_category_e, \
                 price_category_f      = EXCLUDED.price_category_f, \
                 price_category_n      = EXCLUDED.price_category_n, \
                 rrc                   = EXCLUDED.rrc, \
                 volume                = EXCLUDED.volume, \
                 weight                = EXCLUDED.weight, \
                 guarantee             = EXCLUDED.guarantee, \
                 manufacturer          = EXCLUDED.manufacturer, \
                 tax                   = EXCLUDED.tax, \
                 is_discontinued       = EXCLUDED.is_discontinued, \
                 is_deleted            = EXCLUDED.is_deleted, \
                 traceable_good        = EXCLUDED.traceable_good, \
                 updated_at            = NOW()",
        )
        .bind(record.netlab_id)
        .bind(&record.part_number)
        .bind(&record.name)
        .bind(category_id)
        .bind(record.available_kurskaya)
        .bind(record.available_transit)
        .bind(record.available_kaluzhskaya)
        .bind(record.available_lobnenskaya)
        .bind(record.price_category_a)
        .bind(record.price_category_b)
        .bind(record.price_category_c)
        .bind(record.price_category_d)
        .bind(record.price_category_e)
        .bind(record.price_category_f)
        .bind(record.price_category_n)
        .bind(record.rrc)
        .bind(record.volume)
        .bind(record.weight)
        .bind(&record.guarantee)
        .bind(&record.manufacturer)
        .bind(&record.tax)
        .bind(record.is_discontinued)
        .bind(record.is_deleted)
        .bind(record.traceable_good)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(stats)
}

/// Lists products of one category with keyset-free pagination.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products_by_category(
    pool: &PgPool,
    category_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products WHERE category_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
    )
    .bind(category_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Lists products of the given categories, scoped to one catalog, whose
/// chosen tier price is positive and at or below `threshold` (rubles).
///
/// The tier column is selected from a fixed table in [`PriceTier::column`],
/// never from user input, so interpolating it is safe.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products_by_price(
    pool: &PgPool,
    catalog_id: i64,
    category_ids: &[i64],
    tier: PriceTier,
    threshold: f64,
) -> Result<Vec<ProductRow>, DbError> {
    let column = tier.column();
    let sql = format!(
        "SELECT p.* FROM products p \
         JOIN categories c ON c.id = p.category_id \
         WHERE c.catalog_id = $1 AND p.category_id = ANY($2) \
           AND p.{column} > 0 AND p.{column} <= $3 \
         ORDER BY p.{column}, p.id"
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(catalog_id)
        .bind(category_ids)
        .bind(threshold)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
