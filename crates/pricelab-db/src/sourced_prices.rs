//! Database operations for the `sourced_prices` table.
//!
//! Scraped observations merge by the `(product_id, url)` pair: a fresh
//! scrape updates prices for URLs already on file, inserts new URLs, and
//! leaves observations whose retail price has not moved untouched. Rows are
//! never deleted here, so a source that temporarily drops out of search
//! results keeps its last known price.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use pricelab_core::PriceObservation;

use crate::DbError;

/// A row from the `sourced_prices` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SourcedPriceRow {
    pub id: i64,
    pub product_id: i64,
    pub retail_price: f64,
    pub legal_entities_price: Option<f64>,
    pub before_discount_price: Option<f64>,
    pub url: String,
    pub source_name: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// Outcome of merging one product's scraped observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourcedPriceStats {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Merges scraped observations for one product.
///
/// An observation whose URL is unknown is inserted; a known URL with a
/// changed retail price is updated (refreshing `captured_at`); a known URL
/// with the same retail price is counted as skipped and left alone.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn upsert_sourced_prices(
    pool: &PgPool,
    product_id: i64,
    observations: &[PriceObservation],
) -> Result<SourcedPriceStats, DbError> {
    let mut tx = pool.begin().await?;

    let existing: HashMap<String, f64> = sqlx::query_as::<_, (String, f64)>(
        "SELECT url, retail_price FROM sourced_prices WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .collect();

    let mut stats = SourcedPriceStats::default();

    for obs in observations {
        match existing.get(&obs.url) {
            Some(known) if (known - obs.retail_price).abs() < f64::EPSILON => {
                stats.skipped += 1;
            }
            Some(_) => {
                sqlx::query(
                    "UPDATE sourced_prices SET \
                         retail_price = $3, legal_entities_price = $4, \
                         before_discount_price = $5, source_name = $6, \
                         captured_at = NOW() \
                     WHERE product_id = $1 AND url = $2",
                )
                .bind(product_id)
                .bind(&obs.url)
                .bind(obs.retail_price)
                .bind(obs.legal_entities_price)
                .bind(obs.before_discount_price)
                .bind(&obs.source_name)
                .execute(&mut *tx)
                .await?;
                stats.updated += 1;
            }
            None => {
                sqlx::query(
                    "INSERT INTO sourced_prices \
                         (product_id, retail_price, legal_entities_price, \
                          before_discount_price, url, source_name) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(product_id)
                .bind(obs.retail_price)
                .bind(obs.legal_entities_price)
                .bind(obs.before_discount_price)
                .bind(&obs.url)
                .bind(&obs.source_name)
                .execute(&mut *tx)
                .await?;
                stats.created += 1;
            }
        }
    }

    tx.commit().await?;
    Ok(stats)
}

/// Lists one product's observations, most recently captured first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sourced_prices(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<SourcedPriceRow>, DbError> {
    let rows = sqlx::query_as::<_, SourcedPriceRow>(
        "SELECT id, product_id, retail_price, legal_entities_price, \
                before_discount_price, url, source_name, captured_at \
         FROM sourced_prices WHERE product_id = $1 \
         ORDER BY captured_at DESC, id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
