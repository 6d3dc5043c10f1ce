use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seeker_api::config::Config;
use seeker_api::llm_client::{self, LlmClient};
use seeker_api::routes::build_router;
use seeker_api::search::board::AdzunaClient;
use seeker_api::search::cache::{MemorySearchCache, RedisSearchCache, SearchCache};
use seeker_api::search::coordinator::{CoordinatorSettings, SearchCoordinator};
use seeker_api::search::salary::LlmSalaryEstimator;
use seeker_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("seeker_api={},tower_http={}", &config.rust_log, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Seeker API v{}", env!("CARGO_PKG_VERSION"));

    // Cache: Redis when configured, otherwise process memory
    let cache: Arc<dyn SearchCache> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.clone())?;
            let redis_cache = RedisSearchCache::connect(client).await?;
            info!("Redis search cache connected");
            Arc::new(redis_cache)
        }
        None => {
            warn!("REDIS_URL not set; caching searches in memory");
            Arc::new(MemorySearchCache::new())
        }
    };

    let board = AdzunaClient::new(
        config.adzuna_app_id.clone(),
        config.adzuna_app_key.clone(),
        config.adzuna_country.clone(),
    )?;
    info!("Adzuna client initialized (country: {})", config.adzuna_country);

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let search = SearchCoordinator::new(
        Arc::new(board),
        cache.clone(),
        CoordinatorSettings {
            sync_wait: config.search_sync_wait,
            cache_ttl: config.search_cache_ttl,
            failure_ttl: Duration::from_secs(30),
        },
    );

    let state = AppState {
        search: Arc::new(search),
        salary: Arc::new(LlmSalaryEstimator::new(llm)),
        cache,
        config: config.clone(),
    };

    if state.config.api_token.is_none() {
        warn!("API_TOKEN not set; /api/v1 routes are open");
    }

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the web client has a fixed host
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
