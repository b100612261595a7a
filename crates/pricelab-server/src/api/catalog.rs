//! Read endpoints over the local store, plus the price-threshold filter.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use pricelab_db::{CatalogRow, CategoryRow, PriceTier, ProductRow, SourcedPriceRow};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

pub(super) async fn list_catalogs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CatalogRow>>>, ApiError> {
    let data = pricelab_db::list_catalogs(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// A category with its children nested, for tree rendering.
#[derive(Debug, Serialize)]
pub(super) struct CategoryNode {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub leaf: bool,
    pub children: Vec<CategoryNode>,
}

#[derive(Debug, Serialize)]
pub(super) struct CatalogTree {
    pub id: i64,
    pub name: String,
    pub categories: Vec<CategoryNode>,
}

/// Nests a flat category list by `parent_id`. A node whose parent is not in
/// the list (dangling parent from a partial sync) becomes a root.
fn build_category_tree(rows: Vec<CategoryRow>) -> Vec<CategoryNode> {
    use std::collections::HashMap;

    let ids: std::collections::HashSet<i64> = rows.iter().map(|r| r.id).collect();
    let mut children_of: HashMap<i64, Vec<CategoryRow>> = HashMap::new();
    let mut roots: Vec<CategoryRow> = Vec::new();

    for row in rows {
        match row.parent_id {
            Some(parent) if ids.contains(&parent) => {
                children_of.entry(parent).or_default().push(row);
            }
            _ => roots.push(row),
        }
    }

    fn attach(row: CategoryRow, children_of: &mut std::collections::HashMap<i64, Vec<CategoryRow>>) -> CategoryNode {
        let children = children_of
            .remove(&row.id)
            .unwrap_or_default()
            .into_iter()
            .map(|c| attach(c, children_of))
            .collect();
        CategoryNode {
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
            leaf: row.leaf,
            children,
        }
    }

    roots
        .into_iter()
        .map(|r| attach(r, &mut children_of))
        .collect()
}

pub(super) async fn get_catalog_tree(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<CatalogTree>>, ApiError> {
    let catalogs = pricelab_db::list_catalogs(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let Some(catalog) = catalogs.into_iter().find(|c| c.name == name) else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("catalog \"{name}\" does not exist"),
        ));
    };

    let categories = pricelab_db::list_categories_by_catalog(&state.pool, catalog.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CatalogTree {
            id: catalog.id,
            name: catalog.name,
            categories: build_category_tree(categories),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub(super) async fn list_products_by_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(category_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<ProductRow>>>, ApiError> {
    let data = pricelab_db::list_products_by_category(
        &state.pool,
        category_id,
        normalize_limit(page.limit),
        page.offset.unwrap_or(0).max(0),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Price tier parameter, spelled the way the upstream feed labels tiers.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(super) enum PriceTypeParam {
    #[serde(rename = "priceCategoryA")]
    A,
    #[serde(rename = "priceCategoryB")]
    B,
    #[serde(rename = "priceCategoryC")]
    C,
    #[serde(rename = "priceCategoryD")]
    D,
    #[serde(rename = "priceCategoryE")]
    E,
    #[serde(rename = "priceCategoryF")]
    F,
    #[serde(rename = "priceCategoryN")]
    N,
    #[serde(rename = "rrc")]
    Rrc,
}

impl From<PriceTypeParam> for PriceTier {
    fn from(param: PriceTypeParam) -> Self {
        match param {
            PriceTypeParam::A => PriceTier::A,
            PriceTypeParam::B => PriceTier::B,
            PriceTypeParam::C => PriceTier::C,
            PriceTypeParam::D => PriceTier::D,
            PriceTypeParam::E => PriceTier::E,
            PriceTypeParam::F => PriceTier::F,
            PriceTypeParam::N => PriceTier::N,
            PriceTypeParam::Rrc => PriceTier::Rrc,
        }
    }
}

/// Threshold filter: products whose chosen tier price fits within
/// `rub_cost * exchange_rate` rubles.
#[derive(Debug, Deserialize)]
pub(super) struct ProductsByPriceRequest {
    pub catalog_id: i64,
    pub rub_cost: f64,
    pub exchange_rate: f64,
    pub price_type: PriceTypeParam,
    pub category_ids: Vec<i64>,
}

pub(super) async fn list_products_by_price(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<ProductsByPriceRequest>,
) -> Result<Json<ApiResponse<Vec<ProductRow>>>, ApiError> {
    if request.category_ids.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "category_ids must not be empty",
        ));
    }
    let threshold = request.rub_cost * request.exchange_rate;
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "rub_cost and exchange_rate must produce a positive threshold",
        ));
    }

    let data = pricelab_db::list_products_by_price(
        &state.pool,
        request.catalog_id,
        &request.category_ids,
        request.price_type.into(),
        threshold,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_product_sources(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<SourcedPriceRow>>>, ApiError> {
    let data = pricelab_db::list_sourced_prices(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
