mod cache;
mod catalog;
mod config;
mod error;
mod extract;
mod format;
mod history;
mod model;
mod pipeline;
mod prompt;
mod response;
mod scoring;
mod server;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use checker_common::fetch::{FetchConfig, PageFetcher};
use checker_common::ollama::{InferenceBackend, OllamaClient, OllamaClientConfig};
use checker_common::redis::RedisCache;

use cache::ResponseCache;
use catalog::{Checklist, PromptTemplate};
use config::Config;
use extract::ArticleExtractor;
use history::{AnalysisHistory, HISTORY_CAPACITY};
use pipeline::AnalysisPipeline;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting medium-checker");

    // 1. Configuration and catalogs
    let config = Config::from_env()?;
    let checklist = Arc::new(Checklist::load(&config.checklist_path)?);
    let template = Arc::new(PromptTemplate::load(&config.prompts_path)?);
    info!(
        checklist = %config.checklist_path.display(),
        rules = checklist.rules().len(),
        ranges = checklist.ranges().len(),
        target_domain = %config.target_domain,
        "catalog loaded"
    );

    // 2. Model backend (not required to be up at startup)
    let ollama = OllamaClient::new(OllamaClientConfig::from_env())?;
    info!(
        base_url = %ollama.config().base_url,
        model = %ollama.config().model,
        timeout_secs = ollama.config().timeout.as_secs(),
        "ollama client configured"
    );
    if ollama.is_available().await {
        info!("ollama reachable");
    } else {
        warn!("ollama unreachable, is `ollama serve` running?");
    }

    // 3. Optional response cache
    let redis = RedisCache::new(config.redis_url.as_deref(), cache::KEY_NAMESPACE);
    if redis.ping().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without response cache");
    }
    let cache = ResponseCache::new(redis, config.response_cache_ttl_secs);

    // 4. Pipeline and HTTP server
    let fetcher = PageFetcher::new(FetchConfig::default())?;
    info!(
        timeout_secs = fetcher.config().timeout.as_secs(),
        max_attempts = fetcher.config().max_attempts,
        "page fetcher configured"
    );
    let extractor = ArticleExtractor::new(fetcher, config.target_domain.clone());
    let pipeline = Arc::new(AnalysisPipeline::new(extractor, ollama, checklist, template, cache));
    let history = Arc::new(AnalysisHistory::new(HISTORY_CAPACITY));
    let app = server::router(AppState { pipeline, history });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "http server listening");
    axum::serve(listener, app).await?;
    info!("http server shut down");
    Ok(())
}
