//! Heuristic price extraction from unstructured Russian retail text.

use std::sync::LazyLock;

use regex::Regex;

/// Amounts below this are installment payments, delivery fees, or noise.
const MIN_REAL_PRICE: f64 = 400.0;

/// Ceiling above which a "price" is a phone number or SKU misread.
const MAX_REAL_PRICE: f64 = 5_000_000.0;

/// Looser floor for the fallback pass over trusted snippets.
const MIN_ANY_PRICE: f64 = 50.0;

/// Characters of context inspected on each side of a match.
const KEYWORD_WINDOW: usize = 50;

/// A number followed by a ruble marker: `12 500 ₽`, `12500 руб.`, `999 р.`
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d\s]*[.,]?\d*)\s*(?:₽|руб\.|руб\b|р\.|р\b)").expect("valid price regex")
});

/// Phrases that mark a nearby amount as an installment, delivery fee, or
/// discount figure rather than the actual price.
static SPLIT_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)×\s*\d+\s*плат|в рассрочку|частями|платеж|оплат.*в.*раз|split.*payment|курьер|доставк|почт|самовывоз|экономите|скидка|бесплатно|стоимость доставки",
    )
    .expect("valid keyword regex")
});

/// Phrases that mark a nearby amount as a pre-discount price.
static OLD_PRICE_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)без скидки|старая цена|до скидки|вместо|зачеркнут").expect("valid keyword regex")
});

/// Phrases that mark a nearby amount as a business/wholesale price.
static LEGAL_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)юр\.?\s*лиц|юрлиц|для организаций|оптом|опт\.|безнал").expect("valid keyword regex")
});

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok()
}

/// Byte range of the `KEYWORD_WINDOW`-character window around a match,
/// clamped to char boundaries (the text is mostly Cyrillic).
fn context_window(text: &str, start: usize, end: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(KEYWORD_WINDOW - 1)
        .map_or(0, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(KEYWORD_WINDOW)
        .map_or(text.len(), |(i, _)| end + i);
    &text[from..to]
}

/// The `KEYWORD_WINDOW` characters leading up to a match. Qualifier wording
/// like `для юр. лиц` announces the amount that follows it, so an amount
/// must not be claimed by vocabulary that belongs to the next price.
fn preceding_window(text: &str, start: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(KEYWORD_WINDOW - 1)
        .map_or(0, |(i, _)| i);
    &text[from..start]
}

/// Extracts the retail price: the first in-bounds amount, in document order,
/// whose surrounding context carries no installment/delivery keyword.
#[must_use]
pub fn extract_price(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    for m in PRICE_RE.find_iter(text) {
        let fragment = context_window(text, m.start(), m.end());
        if SPLIT_KEYWORDS.is_match(fragment) {
            continue;
        }
        let captures = PRICE_RE.captures(m.as_str())?;
        let Some(v) = parse_amount(&captures[1]) else {
            continue;
        };
        if v < MIN_REAL_PRICE || v > MAX_REAL_PRICE {
            continue;
        }
        return Some(v);
    }
    None
}

/// Whether `v` passes the strict plausibility bounds. Structured prices
/// from search-result metadata go through the same gate as extracted ones.
#[must_use]
pub fn is_plausible(v: f64) -> bool {
    (MIN_REAL_PRICE..=MAX_REAL_PRICE).contains(&v)
}

/// Fallback pass: the largest in-bounds amount anywhere in the text,
/// ignoring keyword context. Used when the strict pass finds nothing on a
/// page known to show a price.
#[must_use]
pub fn extract_price_any(text: &str) -> Option<f64> {
    PRICE_RE
        .captures_iter(text)
        .filter_map(|c| parse_amount(&c[1]))
        .filter(|v| (MIN_ANY_PRICE..=MAX_REAL_PRICE).contains(v))
        .fold(None, |best: Option<f64>, v| {
            Some(best.map_or(v, |b| b.max(v)))
        })
}

/// Extracts a business-entity price: the first in-bounds amount preceded by
/// wholesale or legal-entity wording.
#[must_use]
pub fn extract_legal_price(text: &str) -> Option<f64> {
    for m in PRICE_RE.find_iter(text) {
        let fragment = preceding_window(text, m.start());
        if !LEGAL_KEYWORDS.is_match(fragment) {
            continue;
        }
        let captures = PRICE_RE.captures(m.as_str())?;
        if let Some(v) = captures.get(1).and_then(|g| parse_amount(g.as_str())) {
            if (MIN_REAL_PRICE..=MAX_REAL_PRICE).contains(&v) {
                return Some(v);
            }
        }
    }
    None
}

/// Extracts a pre-discount price: the first in-bounds amount whose context
/// carries old-price wording. Callers should discard it unless it exceeds
/// the retail price.
#[must_use]
pub fn extract_old_price(text: &str) -> Option<f64> {
    for m in PRICE_RE.find_iter(text) {
        let fragment = context_window(text, m.start(), m.end());
        if !OLD_PRICE_KEYWORDS.is_match(fragment) {
            continue;
        }
        let captures = PRICE_RE.captures(m.as_str())?;
        if let Some(v) = captures.get(1).and_then(|g| parse_amount(g.as_str())) {
            if (MIN_REAL_PRICE..=MAX_REAL_PRICE).contains(&v) {
                return Some(v);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_ruble_price() {
        assert_eq!(extract_price("Цена: 21 990 руб. в наличии"), Some(21_990.0));
    }

    #[test]
    fn extracts_ruble_sign_price() {
        assert_eq!(extract_price("Коммутатор — 12 500 ₽, гарантия год"), Some(12_500.0));
    }

    #[test]
    fn extracts_decimal_comma_price() {
        assert_eq!(extract_price("всего 1499,90 руб."), Some(1499.90));
    }

    #[test]
    fn takes_first_match_in_document_order() {
        assert_eq!(
            extract_price("Сегодня 5 990 руб. Вчера было 6 490 руб."),
            Some(5_990.0)
        );
    }

    #[test]
    fn rejects_installment_amounts() {
        // The monthly payment is keyword-guarded; the real price sits far
        // enough away that its own context window is clean.
        let text = "в рассрочку 1 250 руб. в месяц при оформлении; итоговая розничная цена товара составляет 15 000 руб. с гарантией";
        assert_eq!(extract_price(text), Some(15_000.0));
    }

    #[test]
    fn rejects_delivery_fee() {
        let text = "доставка 500 руб. по Москве";
        assert_eq!(extract_price(text), None);
    }

    #[test]
    fn keyword_window_clamps_to_char_boundaries() {
        // Enough Cyrillic on each side that a byte-based window would split
        // a multibyte char. Must not panic.
        let text = format!("{} скидка на всё {} руб. {}", "ы".repeat(80), "9 990", "ё".repeat(80));
        let _ = extract_price(&text);
    }

    #[test]
    fn enforces_lower_bound() {
        assert_eq!(extract_price("мелочь 399 руб."), None);
        assert_eq!(extract_price("товар 400 руб."), Some(400.0));
    }

    #[test]
    fn enforces_upper_bound() {
        assert_eq!(extract_price("лот 5 000 001 руб."), None);
        assert_eq!(extract_price("лот 5 000 000 руб."), Some(5_000_000.0));
    }

    #[test]
    fn does_not_match_bare_letter_inside_word() {
        assert_eq!(extract_price("5 разных моделей"), None);
    }

    #[test]
    fn any_pass_takes_largest_candidate() {
        let text = "от 120 руб. до 4 500 руб. за штуку";
        assert_eq!(extract_price_any(text), Some(4_500.0));
    }

    #[test]
    fn any_pass_ignores_keyword_context() {
        assert_eq!(extract_price_any("доставка 500 руб."), Some(500.0));
    }

    #[test]
    fn old_price_requires_keyword_context() {
        assert_eq!(
            extract_old_price("старая цена 11 990 руб., выгодное предложение"),
            Some(11_990.0)
        );
        assert_eq!(extract_old_price("просто 11 990 руб."), None);
    }

    #[test]
    fn legal_price_requires_keyword_context() {
        let text = "цена 10 000 руб., для юр. лиц 9 500 руб.";
        assert_eq!(extract_legal_price(text), Some(9_500.0));
        assert_eq!(extract_legal_price("просто 10 000 руб."), None);
    }

    #[test]
    fn legal_keyword_after_amount_does_not_claim_it() {
        // The retail amount sits right before the qualifier; only the amount
        // the qualifier introduces may be returned.
        assert_eq!(
            extract_legal_price("всего 10 000 руб., оптом дешевле"),
            None
        );
    }
}
