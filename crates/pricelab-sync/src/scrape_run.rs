//! Category-wide scrape runs: search, extract, and merge sourced prices.

use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;

use pricelab_db::{list_products_by_category, upsert_sourced_prices, ProductRow};
use pricelab_scraper::{PageFetcher, PriceScraper, SearchProvider};

use crate::error::SyncError;

const PAGE_SIZE: i64 = 500;

/// Outcome of one category scrape run. `created`/`updated`/`skipped` count
/// observations merged into the store; `failures` counts products whose
/// search failed and were left untouched.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScrapeReport {
    pub products_processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failures: usize,
}

/// Scrapes competitor prices for every product of a category and merges the
/// observations keyed on `(product_id, url)`.
///
/// Products without a part number cannot be searched and are passed over.
/// A product whose scrape fails is counted and skipped; a database failure
/// during the merge is fatal.
///
/// # Errors
///
/// - [`SyncError::NoProducts`] when the category holds no products.
/// - [`SyncError::Db`] when listing or merging fails.
pub async fn run_category_scrape<S, P>(
    pool: &PgPool,
    scraper: &PriceScraper<S, P>,
    category_id: i64,
    product_delay_ms: u64,
) -> Result<ScrapeReport, SyncError>
where
    S: SearchProvider,
    P: PageFetcher,
{
    let products = load_all_products(pool, category_id).await?;
    if products.is_empty() {
        return Err(SyncError::NoProducts { category_id });
    }
    tracing::info!(category_id, products = products.len(), "starting scrape run");

    let mut report = ScrapeReport::default();

    for product in &products {
        let Some(part_number) = product.part_number.as_deref() else {
            continue;
        };

        match scraper.scrape_product_prices(part_number).await {
            Ok(observations) => {
                let stats = upsert_sourced_prices(pool, product.id, &observations).await?;
                report.created += stats.created;
                report.updated += stats.updated;
                report.skipped += stats.skipped;
                report.products_processed += 1;
            }
            Err(e) => {
                tracing::warn!(
                    product_id = product.id,
                    part_number,
                    error = %e,
                    "scrape failed for product"
                );
                report.failures += 1;
            }
        }

        tokio::time::sleep(Duration::from_millis(product_delay_ms)).await;
    }

    tracing::info!(category_id, ?report, "scrape run complete");
    Ok(report)
}

async fn load_all_products(pool: &PgPool, category_id: i64) -> Result<Vec<ProductRow>, SyncError> {
    let mut products = Vec::new();
    let mut offset = 0;
    loop {
        let page = list_products_by_category(pool, category_id, PAGE_SIZE, offset).await?;
        let len = page.len();
        products.extend(page);
        if (len as i64) < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }
    Ok(products)
}
