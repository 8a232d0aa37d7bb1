use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub mod api;
pub mod cache;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod store;
mod templates;
pub mod upstream;
pub mod util;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vibeverse=info,vibeverse_lib=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    let settings = Arc::new(config::Settings::load()?);
    let upstream = Arc::new(upstream::HttpUpstream::new(settings.upstream_timeout)?);
    let stores = store::connect(&settings).await?;

    if settings.worlds_api_key.is_none() {
        tracing::warn!("MSQUARED_WEBWORLDS_API_KEY is not set; world routes will fail");
    }
    if settings.assets_api_key.is_none() {
        tracing::warn!("MASH_SPACE_API_KEY is not set; object and search routes will fail");
    }

    let app = routes::router(state::AppState::new(settings.clone(), upstream, stores));
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Server listening on {addr} ({})",
        if settings.production { "production" } else { "development" }
    );
    axum::serve(listener, app).await?;
    Ok(())
}
