mod catalog;
mod netlab;
mod sync;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use pricelab_core::AppConfig;
use pricelab_netlab::{NetlabClient, NetlabError};
use pricelab_scraper::{HttpPageFetcher, PriceScraper, YandexSearchClient};
use pricelab_sync::SyncError;

use crate::middleware::{request_id, RequestId};

/// The production scraper pipeline type. `None` in the state when no search
/// API key is configured; scrape endpoints then return an error instead of
/// failing at startup.
pub type Scraper = PriceScraper<YandexSearchClient, HttpPageFetcher>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub netlab: Arc<NetlabClient>,
    pub scraper: Option<Arc<Scraper>>,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "scraper_unconfigured" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 500)
}

pub(super) fn map_db_error(request_id: String, error: &pricelab_db::DbError) -> ApiError {
    match error {
        pricelab_db::DbError::NotFound => {
            ApiError::new(request_id, "not_found", "record not found")
        }
        pricelab_db::DbError::CategoryNotFound { category_id } => ApiError::new(
            request_id,
            "not_found",
            format!("category {category_id} does not exist"),
        ),
        other => {
            tracing::error!(error = %other, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

pub(super) fn map_netlab_error(request_id: String, error: &NetlabError) -> ApiError {
    tracing::warn!(error = %error, "NetLab request failed");
    match error {
        NetlabError::Api { code, message } => ApiError::new(
            request_id,
            "upstream_error",
            format!("NetLab API error {code}: {message}"),
        ),
        _ => ApiError::new(request_id, "upstream_error", "NetLab request failed"),
    }
}

pub(super) fn map_sync_error(request_id: String, error: &SyncError) -> ApiError {
    match error {
        SyncError::Netlab(e) => map_netlab_error(request_id, e),
        SyncError::Db(e) => map_db_error(request_id, e),
        SyncError::NoProducts { category_id } => ApiError::new(
            request_id,
            "not_found",
            format!("no products in category {category_id}"),
        ),
        SyncError::Scraper(e) => {
            tracing::warn!(error = %e, "scrape run failed");
            ApiError::new(request_id, "upstream_error", "search request failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/netlab/catalogs", get(netlab::list_remote_catalogs))
        .route(
            "/api/v1/netlab/categories/{catalog}",
            get(netlab::list_remote_categories),
        )
        .route(
            "/api/v1/netlab/products/{catalog}/{category_id}",
            get(netlab::list_remote_products),
        )
        .route("/api/v1/sync/full", post(sync::run_full_sync))
        .route(
            "/api/v1/sync/categories/{catalog}",
            post(sync::sync_categories),
        )
        .route(
            "/api/v1/sync/products/{catalog}/{category_id}",
            post(sync::sync_products),
        )
        .route(
            "/api/v1/scrape/category/{category_id}",
            post(sync::scrape_category),
        )
        .route("/api/v1/catalogs", get(catalog::list_catalogs))
        .route("/api/v1/catalogs/{name}", get(catalog::get_catalog_tree))
        .route(
            "/api/v1/products/by-category/{category_id}",
            get(catalog::list_products_by_category),
        )
        .route(
            "/api/v1/products/by-price",
            post(catalog::list_products_by_price),
        )
        .route(
            "/api/v1/products/{product_id}/sources",
            get(catalog::list_product_sources),
        )
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match pricelab_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}
