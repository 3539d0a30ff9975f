use std::sync::Arc;

use clap::Parser;
use harbor_scrape::{
    families::{Replications, Repositories, Scans},
    server::{create_router, AppState},
    upstream::Upstream,
    ApiVersion, CollectConfig, Exporter, HarborClient, HarborConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Harbor metrics collector with a write-through scrape cache
#[derive(Parser, Debug)]
#[command(name = "harbor-scrape", version, about, long_about = None)]
struct Cli {
    /// Harbor base URL
    #[arg(long, env = "HARBOR_URL", default_value = "http://localhost")]
    harbor_url: String,

    #[arg(long, env = "HARBOR_USERNAME")]
    harbor_username: Option<String>,

    #[arg(long, env = "HARBOR_PASSWORD", hide_env_values = true)]
    harbor_password: Option<String>,

    /// Subsystem inserted into metric names
    #[arg(long, env = "HARBOR_INSTANCE", default_value = "")]
    harbor_instance: String,

    /// Harbor API generation: v1 or v2
    #[arg(long, env = "HARBOR_API_VERSION", default_value_t = ApiVersion::V2)]
    harbor_api_version: ApiVersion,

    /// Upper bound on pages fetched for one listing
    #[arg(long, env = "HARBOR_MAX_PAGES", default_value_t = 1000)]
    harbor_max_pages: usize,

    #[arg(long, env = "HARBOR_TIMEOUT_SECS", default_value_t = 5)]
    harbor_timeout_secs: u64,

    /// Skip TLS certificate verification
    #[arg(long, env = "HARBOR_INSECURE")]
    harbor_insecure: bool,

    /// Concurrent workers per collection run
    #[arg(long, env = "HARBOR_THREADS", default_value_t = 6)]
    threads: usize,

    #[arg(long, env = "HARBOR_CACHE_ENABLED")]
    cache_enabled: bool,

    /// Cache TTL in seconds (0 disables)
    #[arg(long, env = "HARBOR_CACHE_DURATION_SECS", default_value_t = 20)]
    cache_duration_secs: u64,

    #[arg(long, env = "HARBOR_LISTEN", default_value = "0.0.0.0:9107")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,harbor_scrape=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // ── 1. Configuration ────────────────────────────────────────
    let collect = CollectConfig {
        threads: cli.threads,
        cache_enabled: cli.cache_enabled,
        cache_duration_secs: cli.cache_duration_secs,
    };
    collect.validate()?;

    let harbor = HarborConfig {
        username: cli.harbor_username,
        password: cli.harbor_password,
        instance: cli.harbor_instance,
        timeout_secs: cli.harbor_timeout_secs,
        insecure: cli.harbor_insecure,
        api_version: cli.harbor_api_version,
        max_pages: cli.harbor_max_pages,
        ..HarborConfig::new(cli.harbor_url)
    };

    // ── 2. Upstream client ──────────────────────────────────────
    let client: Arc<dyn Upstream> = Arc::new(HarborClient::new(&harbor)?);
    tracing::info!(
        url = %harbor.api_base(),
        api = %harbor.api_version,
        threads = collect.threads,
        cache = collect.caching(),
        cache_secs = collect.cache_duration_secs,
        "harbor client ready"
    );

    // ── 3. Families ─────────────────────────────────────────────
    let instance = harbor.instance.as_str();
    let mut exporter = Exporter::new(instance);
    exporter
        .add_family(Replications::new(client.clone(), instance), &collect)
        .add_family(
            Repositories::new(client.clone(), instance).api_version(harbor.api_version),
            &collect,
        )
        .add_family(Scans::new(client, instance), &collect);

    // ── 4. Serve ────────────────────────────────────────────────
    let app = create_router(Arc::new(AppState { exporter }));
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    tracing::info!(listen = %cli.listen, "serving /api/scrape, /api/health, /api/stats");

    axum::serve(listener, app).await?;
    Ok(())
}
