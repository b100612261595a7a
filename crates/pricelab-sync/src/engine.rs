//! The catalog sync engine.

use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;

use pricelab_db::{
    get_or_create_catalog, reconcile_categories, reconcile_products, CategoryReconcileStats,
    DbError, ProductReconcileStats,
};
use pricelab_netlab::NetlabClient;

use crate::error::SyncError;
use crate::retry::retry_fixed;

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Additional attempts per upstream fetch after the initial one.
    pub max_retries: u32,
    /// Flat delay between retry attempts.
    pub retry_delay_ms: u64,
    /// Pause between consecutive upstream fetches.
    pub pace_delay_ms: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1_000,
            pace_delay_ms: 30,
        }
    }
}

/// Outcome of a full sync run. Skip counters record work that failed after
/// retries and was left behind; the run itself still succeeds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncReport {
    pub catalogs: usize,
    pub catalogs_skipped: usize,
    pub categories_created: usize,
    pub categories_updated: usize,
    pub products_created: usize,
    pub products_updated: usize,
    pub units_skipped: usize,
}

/// Report for a single-catalog category sync.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategorySyncReport {
    pub catalog_id: i64,
    pub total: usize,
    pub created: usize,
    pub updated: usize,
}

/// Walks the NetLab hierarchy and reconciles it into the local store.
pub struct SyncEngine<'a> {
    client: &'a NetlabClient,
    pool: &'a PgPool,
    options: SyncOptions,
}

/// Flat pause inserted between consecutive upstream calls so the NetLab
/// throttle never trips in the first place.
async fn pace(delay_ms: u64) {
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

impl<'a> SyncEngine<'a> {
    #[must_use]
    pub fn new(client: &'a NetlabClient, pool: &'a PgPool, options: SyncOptions) -> Self {
        Self {
            client,
            pool,
            options,
        }
    }

    /// Synchronizes every catalog: categories first, then the products of
    /// each leaf category.
    ///
    /// Failure handling is deliberately uneven across layers. Losing the
    /// catalog listing means there is nothing to do, so that error is fatal.
    /// A catalog whose category tree cannot be fetched is skipped whole. A
    /// leaf category whose products cannot be fetched or reconciled is
    /// skipped as one unit. Database failures during category reconciliation
    /// are fatal: they indicate the store itself is unhealthy, not the
    /// upstream.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Netlab`] when the catalog listing fails after retries.
    /// - [`SyncError::Db`] on database failures outside the per-unit scope.
    pub async fn run_full_sync(&self) -> Result<SyncReport, SyncError> {
        let opts = self.options;
        let catalogs =
            retry_fixed(opts.max_retries, opts.retry_delay_ms, || {
                self.client.list_catalogs()
            })
            .await?;
        tracing::info!(catalogs = catalogs.len(), "starting full sync");

        let mut report = SyncReport::default();

        for catalog in &catalogs {
            pace(opts.pace_delay_ms).await;
            match self.sync_catalog(&catalog.name, &mut report).await {
                Ok(()) => report.catalogs += 1,
                Err(SyncError::Netlab(e)) => {
                    tracing::warn!(catalog = %catalog.name, error = %e, "skipping catalog");
                    report.catalogs_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(?report, "full sync complete");
        Ok(report)
    }

    async fn sync_catalog(&self, name: &str, report: &mut SyncReport) -> Result<(), SyncError> {
        let opts = self.options;
        let categories = retry_fixed(opts.max_retries, opts.retry_delay_ms, || {
            self.client.list_categories(name)
        })
        .await?;

        let catalog_id = get_or_create_catalog(self.pool, name).await?;
        let stats = reconcile_categories(self.pool, catalog_id, &categories).await?;
        report.categories_created += stats.created;
        report.categories_updated += stats.updated;
        tracing::info!(
            catalog = name,
            total = stats.total,
            created = stats.created,
            updated = stats.updated,
            "categories reconciled"
        );

        for category in categories.iter().filter(|c| c.leaf) {
            pace(opts.pace_delay_ms).await;

            match self.sync_category_products(name, category.id).await {
                Ok(stats) => {
                    report.products_created += stats.created;
                    report.products_updated += stats.updated;
                }
                Err(SyncError::Netlab(e)) => {
                    tracing::warn!(
                        catalog = name,
                        category_id = category.id,
                        error = %e,
                        "skipping category products"
                    );
                    report.units_skipped += 1;
                }
                Err(SyncError::Db(DbError::CategoryNotFound { category_id })) => {
                    tracing::warn!(category_id, "category vanished mid-sync, skipping");
                    report.units_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Fetches and reconciles one catalog's category tree.
    ///
    /// # Errors
    ///
    /// [`SyncError::Netlab`] when the fetch fails after retries,
    /// [`SyncError::Db`] when reconciliation fails.
    pub async fn sync_categories(&self, catalog_name: &str) -> Result<CategorySyncReport, SyncError> {
        let opts = self.options;
        let categories = retry_fixed(opts.max_retries, opts.retry_delay_ms, || {
            self.client.list_categories(catalog_name)
        })
        .await?;
        let catalog_id = get_or_create_catalog(self.pool, catalog_name).await?;
        let stats: CategoryReconcileStats =
            reconcile_categories(self.pool, catalog_id, &categories).await?;
        Ok(CategorySyncReport {
            catalog_id,
            total: stats.total,
            created: stats.created,
            updated: stats.updated,
        })
    }

    /// Fetches and reconciles one category's products.
    ///
    /// # Errors
    ///
    /// [`SyncError::Netlab`] when the fetch fails after retries,
    /// [`SyncError::Db`] when reconciliation fails (including
    /// [`DbError::CategoryNotFound`] for an unsynced category).
    pub async fn sync_category_products(
        &self,
        catalog_name: &str,
        category_id: i64,
    ) -> Result<ProductReconcileStats, SyncError> {
        let opts = self.options;
        let products = retry_fixed(opts.max_retries, opts.retry_delay_ms, || {
            self.client.list_products(catalog_name, category_id)
        })
        .await?;
        let stats = reconcile_products(self.pool, category_id, &products).await?;
        tracing::info!(
            catalog = catalog_name,
            category_id,
            total = stats.total,
            created = stats.created,
            updated = stats.updated,
            "products reconciled"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pace_waits_the_configured_delay() {
        let before = tokio::time::Instant::now();
        pace(30).await;
        assert_eq!(before.elapsed(), Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_pace_does_not_sleep() {
        let before = tokio::time::Instant::now();
        pace(0).await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
