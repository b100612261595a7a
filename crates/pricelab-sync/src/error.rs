use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("NetLab API error: {0}")]
    Netlab(#[from] pricelab_netlab::NetlabError),

    #[error("database error: {0}")]
    Db(#[from] pricelab_db::DbError),

    #[error("scraper error: {0}")]
    Scraper(#[from] pricelab_scraper::ScraperError),

    #[error("no products in category {category_id}")]
    NoProducts { category_id: i64 },
}
