use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pricelab_core::AppConfig;
use pricelab_netlab::NetlabClient;
use pricelab_scraper::{HttpPageFetcher, PriceScraper, ScrapeConfig, YandexSearchClient};
use pricelab_sync::{run_category_scrape, SyncEngine, SyncOptions};

#[derive(Debug, Parser)]
#[command(name = "pricelab-cli")]
#[command(about = "Pricelab catalog sync and scraping from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a full catalog sync and print the report.
    Sync,
    /// Fetch and reconcile one catalog's category tree.
    LoadCategories { catalog: String },
    /// Fetch and reconcile one category's products.
    LoadProducts { catalog: String, category_id: i64 },
    /// Scrape competitor prices for every product of a category.
    Scrape { category_id: i64 },
}

fn sync_options(config: &AppConfig) -> SyncOptions {
    SyncOptions {
        max_retries: config.sync_max_retries,
        retry_delay_ms: config.sync_retry_delay_ms,
        pace_delay_ms: config.sync_pace_delay_ms,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pricelab_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pricelab_db::PoolConfig::from_app_config(&config);
    let pool = pricelab_db::connect_pool(&config.database_url, pool_config).await?;
    pricelab_db::run_migrations(&pool).await?;

    let client = NetlabClient::new(
        &config.netlab_api_url,
        &config.netlab_login,
        &config.netlab_password,
        config.netlab_request_timeout_secs,
    )?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync => {
            let engine = SyncEngine::new(&client, &pool, sync_options(&config));
            let report = engine.run_full_sync().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::LoadCategories { catalog } => {
            let engine = SyncEngine::new(&client, &pool, sync_options(&config));
            let report = engine.sync_categories(&catalog).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::LoadProducts {
            catalog,
            category_id,
        } => {
            let engine = SyncEngine::new(&client, &pool, sync_options(&config));
            let stats = engine.sync_category_products(&catalog, category_id).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Scrape { category_id } => {
            let scraper = build_scraper(&config)?;
            let report = run_category_scrape(
                &pool,
                &scraper,
                category_id,
                config.scraper_product_delay_ms,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn build_scraper(
    config: &AppConfig,
) -> anyhow::Result<PriceScraper<YandexSearchClient, HttpPageFetcher>> {
    let api_key = config
        .yandex_api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("YANDEX_API_KEY is required for scraping"))?;
    let folder_id = config
        .yandex_folder_id
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("YANDEX_FOLDER_ID is required for scraping"))?;

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
    Ok(PriceScraper::new(
        search,
        pages,
        ScrapeConfig {
            max_results: config.scraper_max_results,
            page_delay_ms: config.scraper_page_delay_ms,
        },
    ))
}
