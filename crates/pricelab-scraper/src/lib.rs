//! Competitor price scraping via web search.
//!
//! One search query per product part number, then price extraction from
//! snippet text (for trusted marketplace domains) or from the fetched page
//! body. Extraction is heuristic: a currency-marker regex plus a keyword
//! window that rejects installment/delivery amounts masquerading as prices.

pub mod domains;
pub mod error;
pub mod page;
pub mod price;
pub mod scrape;
pub mod search;

pub use error::ScraperError;
pub use page::{HttpPageFetcher, PageFetcher};
pub use scrape::{PriceScraper, ScrapeConfig};
pub use search::{SearchHit, SearchProvider, YandexSearchClient};
