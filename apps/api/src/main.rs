mod config;
mod embedding;
mod errors;
mod models;
mod repository;
mod routes;
mod state;
mod sync;
mod vector_store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::openai::OpenAiEmbedder;
use crate::repository::postgres::{create_pool, PgJobBoard};
use crate::routes::build_router;
use crate::state::AppState;
use crate::sync::service::JobSyncService;
use crate::vector_store::pinecone::PineconeClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ResuMatch API v{}", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&config.database_url).await?;
    let repo = Arc::new(PgJobBoard::new(pool));

    let vectors = Arc::new(PineconeClient::new(
        config.pinecone_index_host.clone(),
        config.pinecone_api_key.clone(),
    )?);
    info!("Vector index client initialized ({})", config.pinecone_index_host);

    let embedder = Arc::new(OpenAiEmbedder::new(
        &config.openai_base_url,
        config.openai_api_key.clone(),
        config.embedding_model.clone(),
    )?);
    info!("Embedding client initialized (model: {})", embedder.model());

    info!(
        "Cascade limits: {} concurrent, {:?} deadline",
        config.cascade.concurrency, config.cascade.deadline
    );
    let jobs = JobSyncService::new(repo, vectors, embedder, config.cascade);

    let state = AppState {
        jobs: Arc::new(jobs),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
