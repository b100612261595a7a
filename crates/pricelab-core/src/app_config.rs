use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,

    /// Base URL of the NetLab distributor API.
    pub netlab_api_url: String,
    pub netlab_login: String,
    pub netlab_password: String,
    pub netlab_request_timeout_secs: u64,

    /// Base URL of the Yandex XML search endpoint.
    pub yandex_search_url: String,
    pub yandex_api_key: Option<String>,
    pub yandex_folder_id: Option<String>,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    /// Additional attempts after the first failure of a remote call.
    pub sync_max_retries: u32,
    /// Fixed delay between retry attempts.
    pub sync_retry_delay_ms: u64,
    /// Cooperative pacing delay between consecutive remote calls.
    pub sync_pace_delay_ms: u64,

    pub scraper_user_agent: String,
    pub scraper_page_timeout_secs: u64,
    /// Delay between sequential page fetches within one product's scrape.
    pub scraper_page_delay_ms: u64,
    /// Delay between consecutive products in a category scrape run.
    pub scraper_product_delay_ms: u64,
    /// Per-product cap on sourced-price observations.
    pub scraper_max_results: usize,
    /// Search result pages to walk per query.
    pub search_max_pages: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("netlab_api_url", &self.netlab_api_url)
            .field("netlab_login", &self.netlab_login)
            .field("netlab_password", &"[redacted]")
            .field(
                "netlab_request_timeout_secs",
                &self.netlab_request_timeout_secs,
            )
            .field("yandex_search_url", &self.yandex_search_url)
            .field(
                "yandex_api_key",
                &self.yandex_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("yandex_folder_id", &self.yandex_folder_id)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("sync_max_retries", &self.sync_max_retries)
            .field("sync_retry_delay_ms", &self.sync_retry_delay_ms)
            .field("sync_pace_delay_ms", &self.sync_pace_delay_ms)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_page_timeout_secs", &self.scraper_page_timeout_secs)
            .field("scraper_page_delay_ms", &self.scraper_page_delay_ms)
            .field("scraper_product_delay_ms", &self.scraper_product_delay_ms)
            .field("scraper_max_results", &self.scraper_max_results)
            .field("search_max_pages", &self.search_max_pages)
            .finish()
    }
}
