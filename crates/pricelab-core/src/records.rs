//! Typed records for data crossing the ingestion boundary.
//!
//! The NetLab product feed delivers free-form, Cyrillic-labeled name/value
//! property pairs. [`ProductRecord::from_properties`] applies the explicit
//! mapping table once, at the boundary: unknown keys are ignored and missing
//! keys fall back to per-field defaults, so the rest of the system only ever
//! sees typed fields.

use std::collections::HashMap;

use serde::Serialize;

/// A catalog as listed by the upstream API. Identified by name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRecord {
    pub name: String,
}

/// One node of a catalog's category tree.
///
/// `parent_id` is `None` for roots. A `parent_id` referencing a category not
/// yet synced locally is legal: partial syncs may deliver children first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub leaf: bool,
}

/// A product after property mapping, keyed upstream by `netlab_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub netlab_id: i64,
    pub part_number: Option<String>,
    pub name: String,
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
}

/// One competitor price observation scraped for a product.
///
/// Identity for reconciliation is the pair `(product_id, url)`; this type
/// carries only the scraped half.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceObservation {
    pub retail_price: f64,
    pub legal_entities_price: Option<f64>,
    pub before_discount_price: Option<f64>,
    pub url: String,
    pub source_name: Option<String>,
}

/// Parses a numeric string leniently, returning `default` on anything that
/// is not a plain decimal number. Upstream numeric fields are free-form
/// strings and a malformed one must not abort a whole batch.
#[must_use]
pub fn parse_f64_or(value: Option<&str>, default: f64) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

/// Integer counterpart of [`parse_f64_or`]. Fractional strings are treated
/// as malformed, matching the upstream convention for count-like fields.
#[must_use]
pub fn parse_i32_or(value: Option<&str>, default: i32) -> i32 {
    value
        .and_then(|v| v.trim().parse::<i32>().ok())
        .unwrap_or(default)
}

fn parse_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

impl ProductRecord {
    /// Builds a typed record from the upstream property bag.
    ///
    /// Property labels are the literal Cyrillic field names the NetLab feed
    /// uses. Missing numeric properties default to `0`, missing text
    /// properties to their placeholder defaults.
    #[must_use]
    pub fn from_properties(netlab_id: i64, props: &HashMap<String, String>) -> Self {
        let get = |key: &str| props.get(key).map(String::as_str);
        let f = |key: &str| parse_f64_or(get(key), 0.0);

        Self {
            netlab_id,
            part_number: get("PN").filter(|v| !v.is_empty()).map(str::to_owned),
            name: get("название")
                .filter(|v| !v.is_empty())
                .unwrap_or("Без названия")
                .to_owned(),
            available_kurskaya: f("количество на Курской"),
            available_transit: f("количество в транзите"),
            available_kaluzhskaya: f("количество на Калужской"),
            available_lobnenskaya: f("количество на Лобненской"),
            price_category_a: f("цена по категории A"),
            price_category_b: f("цена по категории B"),
            price_category_c: f("цена по категории C"),
            price_category_d: f("цена по категории D"),
            price_category_e: f("цена по категории E"),
            price_category_f: f("цена по категории F"),
            price_category_n: f("цена по категории N"),
            rrc: f("РРЦ"),
            volume: f("объём, м^3"),
            weight: f("вес, кг"),
            guarantee: get("гарантия")
                .filter(|v| !v.is_empty())
                .unwrap_or("не указано")
                .to_owned(),
            manufacturer: get("производитель")
                .filter(|v| !v.is_empty())
                .unwrap_or("не указано")
                .to_owned(),
            tax: get("НДС").filter(|v| !v.is_empty()).map(str::to_owned),
            is_discontinued: parse_bool(get("снят с производства")),
            is_deleted: parse_bool(get("удален")),
            traceable_good: parse_i32_or(get("Прослеживаемый товар"), 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn parse_f64_or_accepts_plain_decimal() {
        assert!((parse_f64_or(Some("123.45"), 0.0) - 123.45).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_f64_or_trims_whitespace() {
        assert!((parse_f64_or(Some(" 7 "), 0.0) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_f64_or_falls_back_on_garbage() {
        assert!((parse_f64_or(Some("12,5"), 0.0)).abs() < f64::EPSILON);
        assert!((parse_f64_or(Some("нет"), 0.0)).abs() < f64::EPSILON);
        assert!((parse_f64_or(None, 0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_i32_or_rejects_fractions() {
        assert_eq!(parse_i32_or(Some("3.5"), 0), 0);
        assert_eq!(parse_i32_or(Some("-2"), 0), -2);
        assert_eq!(parse_i32_or(Some("17"), 0), 17);
    }

    #[test]
    fn product_record_maps_known_properties() {
        let p = props(&[
            ("PN", "ABC-123"),
            ("название", "Маршрутизатор"),
            ("цена по категории A", "1500.50"),
            ("РРЦ", "1999"),
            ("вес, кг", "0.4"),
            ("производитель", "TP-Link"),
            ("снят с производства", "true"),
            ("Прослеживаемый товар", "1"),
        ]);
        let record = ProductRecord::from_properties(42, &p);

        assert_eq!(record.netlab_id, 42);
        assert_eq!(record.part_number.as_deref(), Some("ABC-123"));
        assert_eq!(record.name, "Маршрутизатор");
        assert!((record.price_category_a - 1500.50).abs() < f64::EPSILON);
        assert!((record.rrc - 1999.0).abs() < f64::EPSILON);
        assert!((record.weight - 0.4).abs() < f64::EPSILON);
        assert_eq!(record.manufacturer, "TP-Link");
        assert!(record.is_discontinued);
        assert!(!record.is_deleted);
        assert_eq!(record.traceable_good, 1);
    }

    #[test]
    fn product_record_defaults_missing_properties() {
        let record = ProductRecord::from_properties(7, &HashMap::new());

        assert_eq!(record.name, "Без названия");
        assert!(record.part_number.is_none());
        assert_eq!(record.guarantee, "не указано");
        assert_eq!(record.manufacturer, "не указано");
        assert!(record.tax.is_none());
        assert!((record.price_category_a).abs() < f64::EPSILON);
        assert!(!record.is_discontinued);
    }

    #[test]
    fn product_record_ignores_unknown_properties() {
        let p = props(&[("совершенно новый ключ", "значение"), ("название", "X")]);
        let record = ProductRecord::from_properties(1, &p);
        assert_eq!(record.name, "X");
    }

    #[test]
    fn product_record_malformed_numeric_degrades_to_default() {
        let p = props(&[("цена по категории B", "дорого"), ("объём, м^3", "")]);
        let record = ProductRecord::from_properties(1, &p);
        assert!((record.price_category_b).abs() < f64::EPSILON);
        assert!((record.volume).abs() < f64::EPSILON);
    }
}
