//! The per-product scrape pipeline: search, classify, extract.

use std::collections::HashSet;
use std::time::Duration;

use pricelab_core::PriceObservation;

use crate::domains;
use crate::error::ScraperError;
use crate::page::PageFetcher;
use crate::price::{
    extract_legal_price, extract_old_price, extract_price, extract_price_any, is_plausible,
};
use crate::search::{SearchHit, SearchProvider};

#[derive(Debug, Clone, Copy)]
pub struct ScrapeConfig {
    /// Cap on observations per product.
    pub max_results: usize,
    /// Pause between page fetches, to stay polite with shop servers.
    pub page_delay_ms: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            page_delay_ms: 300,
        }
    }
}

/// Scrapes competitor prices for single products.
///
/// Generic over the search backend and page fetcher so the pipeline can be
/// exercised without network access.
#[derive(Debug)]
pub struct PriceScraper<S, P> {
    search: S,
    pages: P,
    config: ScrapeConfig,
}

impl<S: SearchProvider, P: PageFetcher> PriceScraper<S, P> {
    pub fn new(search: S, pages: P, config: ScrapeConfig) -> Self {
        Self {
            search,
            pages,
            config,
        }
    }

    /// Gathers price observations for one part number.
    ///
    /// Issues a `"<part_number> цена"` query, then walks the results in rank
    /// order: a result carrying a plausible structured `offer_info` price is
    /// taken as-is, marketplace domains are priced from their snippet,
    /// excluded domains are dropped, everything else gets its page fetched
    /// and scanned. Results are deduplicated by URL and capped at
    /// `max_results`. A page that fails to fetch or yields no price is
    /// skipped, never fatal.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] only when the search query itself fails.
    pub async fn scrape_product_prices(
        &self,
        part_number: &str,
    ) -> Result<Vec<PriceObservation>, ScraperError> {
        let query = format!("{part_number} цена");
        let hits = self.search.search(&query).await?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut observations = Vec::new();

        for hit in hits {
            if observations.len() >= self.config.max_results {
                break;
            }
            if !seen.insert(hit.url.clone()) {
                continue;
            }

            if domains::is_fast(&hit.url) {
                if let Some(obs) = observation_from_offer(&hit).or_else(|| {
                    observation_from_text(&hit.url, hit.source_name.clone(), &hit.snippet, false)
                }) {
                    observations.push(obs);
                }
                continue;
            }
            if domains::is_skipped(&hit.url) {
                tracing::trace!(url = %hit.url, "excluded domain");
                continue;
            }
            // A structured marketplace price makes the page fetch redundant.
            if let Some(obs) = observation_from_offer(&hit) {
                observations.push(obs);
                continue;
            }

            let text = match self.pages.fetch_text(&hit.url).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(url = %hit.url, error = %e, "page fetch failed, skipping");
                    continue;
                }
            };
            if let Some(obs) = observation_from_text(&hit.url, hit.source_name, &text, true) {
                observations.push(obs);
            }

            tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
        }

        tracing::debug!(
            part_number,
            observations = observations.len(),
            "product scrape complete"
        );
        Ok(observations)
    }
}

/// Builds an observation from a hit's structured `offer_info` prices. The
/// structured retail price wins over text extraction whenever it passes the
/// plausibility gate; the legal-entity price still comes from the snippet
/// since `offer_info` never carries one.
fn observation_from_offer(hit: &SearchHit) -> Option<PriceObservation> {
    let retail = hit.offer_price.filter(|v| is_plausible(*v))?;
    Some(PriceObservation {
        retail_price: retail,
        legal_entities_price: extract_legal_price(&hit.snippet)
            .filter(|v| (v - retail).abs() > f64::EPSILON),
        before_discount_price: hit.offer_old_price.filter(|v| *v > retail),
        url: hit.url.clone(),
        source_name: hit
            .source_name
            .clone()
            .or_else(|| domains::source_name(&hit.url)),
    })
}

/// Builds an observation from extracted prices, or `None` when no retail
/// price is found. The loose largest-candidate fallback only applies to
/// fetched pages; snippets without a clean price are not trusted.
fn observation_from_text(
    url: &str,
    source_name: Option<String>,
    text: &str,
    allow_fallback: bool,
) -> Option<PriceObservation> {
    let retail = match extract_price(text) {
        Some(v) => v,
        None if allow_fallback => extract_price_any(text)?,
        None => return None,
    };
    Some(PriceObservation {
        retail_price: retail,
        legal_entities_price: extract_legal_price(text).filter(|v| (v - retail).abs() > f64::EPSILON),
        before_discount_price: extract_old_price(text).filter(|v| *v > retail),
        url: url.to_string(),
        source_name: source_name.or_else(|| domains::source_name(url)),
    })
}
