//! Live integration tests for pricelab-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/pricelab-db/`), so `"../../migrations"` resolves to the
//! workspace migration directory.

use std::collections::HashMap;

use sqlx::PgPool;

use pricelab_core::{CategoryRecord, PriceObservation, ProductRecord};
use pricelab_db::{
    get_or_create_catalog, list_categories_by_catalog, list_products_by_category,
    list_products_by_price, list_sourced_prices, reconcile_categories, reconcile_products,
    upsert_sourced_prices, DbError, PriceTier,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn category(id: i64, name: &str, parent_id: Option<i64>, leaf: bool) -> CategoryRecord {
    CategoryRecord {
        id,
        name: name.to_string(),
        parent_id,
        leaf,
    }
}

fn product(netlab_id: i64, name: &str, price_a: f64) -> ProductRecord {
    let mut props = HashMap::new();
    props.insert("название".to_string(), name.to_string());
    props.insert("цена по категории A".to_string(), price_a.to_string());
    ProductRecord::from_properties(netlab_id, &props)
}

fn observation(url: &str, retail: f64) -> PriceObservation {
    PriceObservation {
        retail_price: retail,
        legal_entities_price: None,
        before_discount_price: None,
        url: url.to_string(),
        source_name: Some("example.ru".to_string()),
    }
}

// ---------------------------------------------------------------------------
// catalogs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn get_or_create_catalog_is_idempotent(pool: PgPool) {
    let first = get_or_create_catalog(&pool, "Электроника")
        .await
        .expect("first insert");
    let second = get_or_create_catalog(&pool, "Электроника")
        .await
        .expect("second call");
    assert_eq!(first, second);

    let other = get_or_create_catalog(&pool, "Ноутбуки")
        .await
        .expect("different name");
    assert_ne!(first, other);
}

// ---------------------------------------------------------------------------
// categories
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_categories_creates_then_updates(pool: PgPool) {
    let catalog_id = get_or_create_catalog(&pool, "network").await.expect("catalog");

    let records = vec![
        category(100, "Коммутаторы", None, false),
        category(101, "Управляемые", Some(100), true),
    ];
    let stats = reconcile_categories(&pool, catalog_id, &records)
        .await
        .expect("first pass");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.created, 2);
    assert_eq!(stats.updated, 0);

    let renamed = vec![
        category(100, "Коммутаторы и хабы", None, false),
        category(101, "Управляемые", Some(100), true),
        category(102, "Неуправляемые", Some(100), true),
    ];
    let stats = reconcile_categories(&pool, catalog_id, &renamed)
        .await
        .expect("second pass");
    assert_eq!(stats.created, 1);
    assert_eq!(stats.updated, 2);

    let rows = list_categories_by_catalog(&pool, catalog_id)
        .await
        .expect("list");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].name, "Коммутаторы и хабы");
}

#[sqlx::test(migrations = "../../migrations")]
async fn category_with_absent_parent_is_accepted(pool: PgPool) {
    let catalog_id = get_or_create_catalog(&pool, "network").await.expect("catalog");

    // Parent 999 has not been delivered; the child must still land.
    let records = vec![category(500, "Orphan", Some(999), true)];
    let stats = reconcile_categories(&pool, catalog_id, &records)
        .await
        .expect("orphan insert");
    assert_eq!(stats.created, 1);

    let rows = list_categories_by_catalog(&pool, catalog_id)
        .await
        .expect("list");
    assert_eq!(rows[0].parent_id, Some(999));
}

// ---------------------------------------------------------------------------
// products
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_products_keys_on_netlab_id(pool: PgPool) {
    let catalog_id = get_or_create_catalog(&pool, "network").await.expect("catalog");
    reconcile_categories(&pool, catalog_id, &[category(10, "Leaf", None, true)])
        .await
        .expect("categories");

    let stats = reconcile_products(&pool, 10, &[product(42, "Коммутатор", 1500.0)])
        .await
        .expect("first pass");
    assert_eq!(stats.created, 1);

    let rows = list_products_by_category(&pool, 10, 50, 0).await.expect("list");
    let surrogate_id = rows[0].id;

    let stats = reconcile_products(&pool, 10, &[product(42, "Коммутатор v2", 1600.0)])
        .await
        .expect("second pass");
    assert_eq!(stats.created, 0);
    assert_eq!(stats.updated, 1);

    let rows = list_products_by_category(&pool, 10, 50, 0).await.expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, surrogate_id, "surrogate id must be stable across syncs");
    assert_eq!(rows[0].name, "Коммутатор v2");
    assert!((rows[0].price_category_a - 1600.0).abs() < f64::EPSILON);
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_pass_mixes_updates_and_inserts(pool: PgPool) {
    let catalog_id = get_or_create_catalog(&pool, "Электроника")
        .await
        .expect("catalog");
    reconcile_categories(&pool, catalog_id, &[category(10, "Коммутаторы", None, true)])
        .await
        .expect("categories");

    let stats = reconcile_products(
        &pool,
        10,
        &[
            product(1, "Alpha", 1000.0),
            product(2, "Beta", 2000.0),
            product(3, "Gamma", 3000.0),
        ],
    )
    .await
    .expect("first pass");
    assert_eq!(stats.created, 3);
    assert_eq!(stats.updated, 0);

    let rows = list_products_by_category(&pool, 10, 50, 0).await.expect("list");
    let ids_before: HashMap<i64, i64> = rows.iter().map(|r| (r.netlab_id, r.id)).collect();

    // Second delivery: Beta's price moved, Delta is new, Alpha and Gamma
    // arrive unchanged.
    let stats = reconcile_products(
        &pool,
        10,
        &[
            product(1, "Alpha", 1000.0),
            product(2, "Beta", 2500.0),
            product(3, "Gamma", 3000.0),
            product(4, "Delta", 4000.0),
        ],
    )
    .await
    .expect("second pass");
    assert_eq!(stats.created, 1);
    assert_eq!(stats.updated, 3);

    let rows = list_products_by_category(&pool, 10, 50, 0).await.expect("list");
    assert_eq!(rows.len(), 4);
    let by_netlab: HashMap<i64, _> = rows.iter().map(|r| (r.netlab_id, r)).collect();

    for netlab_id in [1, 2, 3] {
        assert_eq!(
            by_netlab[&netlab_id].id, ids_before[&netlab_id],
            "surrogate ids must survive the second pass"
        );
    }
    assert!((by_netlab[&1].price_category_a - 1000.0).abs() < f64::EPSILON);
    assert!((by_netlab[&2].price_category_a - 2500.0).abs() < f64::EPSILON);
    assert!((by_netlab[&3].price_category_a - 3000.0).abs() < f64::EPSILON);
    assert_eq!(by_netlab[&4].name, "Delta");
}

#[sqlx::test(migrations = "../../migrations")]
async fn reconcile_products_rejects_unknown_category(pool: PgPool) {
    let err = reconcile_products(&pool, 777, &[product(1, "X", 100.0)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::CategoryNotFound { category_id: 777 }
    ));

    // Nothing may have been written before the check fired.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn products_by_price_filters_on_tier_threshold(pool: PgPool) {
    let catalog_id = get_or_create_catalog(&pool, "network").await.expect("catalog");
    reconcile_categories(&pool, catalog_id, &[category(10, "Leaf", None, true)])
        .await
        .expect("categories");
    reconcile_products(
        &pool,
        10,
        &[
            product(1, "Cheap", 900.0),
            product(2, "Mid", 4500.0),
            product(3, "Expensive", 90_000.0),
            product(4, "Unpriced", 0.0),
        ],
    )
    .await
    .expect("products");

    let rows = list_products_by_price(&pool, catalog_id, &[10], PriceTier::A, 5000.0)
        .await
        .expect("filter");
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    // Zero-priced rows are excluded, results ordered by the tier price.
    assert_eq!(names, vec!["Cheap", "Mid"]);

    let other = list_products_by_price(&pool, catalog_id + 1, &[10], PriceTier::A, 5000.0)
        .await
        .expect("filter");
    assert!(other.is_empty(), "catalog scoping must exclude foreign catalogs");
}

// ---------------------------------------------------------------------------
// sourced prices
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn sourced_prices_merge_by_product_and_url(pool: PgPool) {
    let catalog_id = get_or_create_catalog(&pool, "network").await.expect("catalog");
    reconcile_categories(&pool, catalog_id, &[category(10, "Leaf", None, true)])
        .await
        .expect("categories");
    reconcile_products(&pool, 10, &[product(42, "Коммутатор", 1500.0)])
        .await
        .expect("products");
    let product_id = list_products_by_category(&pool, 10, 1, 0)
        .await
        .expect("list")[0]
        .id;

    let first = vec![
        observation("https://a.ru/item", 1490.0),
        observation("https://b.ru/item", 1520.0),
    ];
    let stats = upsert_sourced_prices(&pool, product_id, &first)
        .await
        .expect("first merge");
    assert_eq!(stats.created, 2);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.skipped, 0);

    // Second pass: a.ru unchanged, b.ru moved, c.ru is new.
    let second = vec![
        observation("https://a.ru/item", 1490.0),
        observation("https://b.ru/item", 1480.0),
        observation("https://c.ru/item", 1505.0),
    ];
    let stats = upsert_sourced_prices(&pool, product_id, &second)
        .await
        .expect("second merge");
    assert_eq!(stats.created, 1);
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.skipped, 1);

    let rows = list_sourced_prices(&pool, product_id).await.expect("list");
    assert_eq!(rows.len(), 3);
    let b = rows
        .iter()
        .find(|r| r.url == "https://b.ru/item")
        .expect("b.ru row");
    assert!((b.retail_price - 1480.0).abs() < f64::EPSILON);
}
