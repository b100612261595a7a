mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pricelab_scraper::{HttpPageFetcher, PriceScraper, ScrapeConfig, YandexSearchClient};

use crate::api::{build_app, AppState, Scraper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pricelab_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pricelab_db::PoolConfig::from_app_config(&config);
    let pool = pricelab_db::connect_pool(&config.database_url, pool_config).await?;
    pricelab_db::run_migrations(&pool).await?;

    let netlab = Arc::new(pricelab_netlab::NetlabClient::new(
        &config.netlab_api_url,
        &config.netlab_login,
        &config.netlab_password,
        config.netlab_request_timeout_secs,
    )?);

    let scraper = build_scraper(&config)?;
    if scraper.is_none() {
        tracing::warn!("YANDEX_API_KEY not set; scrape endpoints disabled");
    }

    let app = build_app(AppState {
        pool,
        netlab,
        scraper,
        config: Arc::clone(&config),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_scraper(config: &pricelab_core::AppConfig) -> anyhow::Result<Option<Arc<Scraper>>> {
    let (Some(api_key), Some(folder_id)) = (
        config.yandex_api_key.as_deref(),
        config.yandex_folder_id.as_deref(),
    ) else {
        return Ok(None);
    };

    let search = YandexSearchClient::new(
        &config.yandex_search_url,
        api_key,
        folder_id,
        config.scraper_page_timeout_secs,
        config.search_max_pages,
    )?;
    let pages = HttpPageFetcher::new(
        &config.scraper_user_agent,
        config.scraper_page_timeout_secs,
    )?;
    let scrape_config = ScrapeConfig {
        max_results: config.scraper_max_results,
        page_delay_ms: config.scraper_page_delay_ms,
    };
    Ok(Some(Arc::new(PriceScraper::new(
        search,
        pages,
        scrape_config,
    ))))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
