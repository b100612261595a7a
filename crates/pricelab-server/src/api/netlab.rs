//! Live proxies to the NetLab API: fetch without touching the local store.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use pricelab_core::{CatalogRecord, CategoryRecord, ProductRecord};

use crate::middleware::RequestId;

use super::{map_netlab_error, ApiError, ApiResponse, AppState, ResponseMeta};

pub(super) async fn list_remote_catalogs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CatalogRecord>>>, ApiError> {
    let data = state
        .netlab
        .list_catalogs()
        .await
        .map_err(|e| map_netlab_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_remote_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(catalog): Path<String>,
) -> Result<Json<ApiResponse<Vec<CategoryRecord>>>, ApiError> {
    let data = state
        .netlab
        .list_categories(&catalog)
        .await
        .map_err(|e| map_netlab_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_remote_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((catalog, category_id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<Vec<ProductRecord>>>, ApiError> {
    let data = state
        .netlab
        .list_products(&catalog, category_id)
        .await
        .map_err(|e| map_netlab_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
