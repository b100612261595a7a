//! Sync and scrape-run endpoints: each returns the run's statistics.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use pricelab_db::ProductReconcileStats;
use pricelab_sync::{
    engine::CategorySyncReport, run_category_scrape, ScrapeReport, SyncEngine, SyncOptions,
    SyncReport,
};

use crate::middleware::RequestId;

use super::{map_sync_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Full-run response: the counts plus a human-readable message that names
/// partial failure instead of hiding it.
#[derive(Debug, Serialize)]
pub(super) struct FullSyncData {
    pub message: String,
    pub report: SyncReport,
}

fn sync_options(state: &AppState) -> SyncOptions {
    SyncOptions {
        max_retries: state.config.sync_max_retries,
        retry_delay_ms: state.config.sync_retry_delay_ms,
        pace_delay_ms: state.config.sync_pace_delay_ms,
    }
}

pub(super) async fn run_full_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<FullSyncData>>, ApiError> {
    let engine = SyncEngine::new(&state.netlab, &state.pool, sync_options(&state));
    let report = engine
        .run_full_sync()
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    let skipped = report.catalogs_skipped + report.units_skipped;
    let message = if skipped == 0 {
        format!("synchronized {} catalogs", report.catalogs)
    } else {
        format!(
            "synchronized {} catalogs with {skipped} skipped units",
            report.catalogs
        )
    };

    Ok(Json(ApiResponse {
        data: FullSyncData { message, report },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn sync_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(catalog): Path<String>,
) -> Result<Json<ApiResponse<CategorySyncReport>>, ApiError> {
    let engine = SyncEngine::new(&state.netlab, &state.pool, sync_options(&state));
    let report = engine
        .sync_categories(&catalog)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn sync_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((catalog, category_id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<ProductReconcileStats>>, ApiError> {
    let engine = SyncEngine::new(&state.netlab, &state.pool, sync_options(&state));
    let stats = engine
        .sync_category_products(&catalog, category_id)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data: stats,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn scrape_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(category_id): Path<i64>,
) -> Result<Json<ApiResponse<ScrapeReport>>, ApiError> {
    let Some(scraper) = state.scraper.as_deref() else {
        return Err(ApiError::new(
            req_id.0,
            "scraper_unconfigured",
            "search API credentials are not configured",
        ));
    };

    let report = run_category_scrape(
        &state.pool,
        scraper,
        category_id,
        state.config.scraper_product_delay_ms,
    )
    .await
    .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
