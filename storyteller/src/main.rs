use std::sync::Arc;

use clap::Parser;
use storyteller::{AppState, Config, app, init_logging};
use tracing::{info, warn};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let config = Config::parse();

    let storyteller = config.storyteller().map(Arc::new);
    if storyteller.is_none() {
        warn!("GEMINI_API_KEY not set; story generation disabled");
    }
    let state = AppState {
        storyteller,
        defaults: Arc::new(config.request_defaults()),
        static_dir: Some(config.static_dir.clone()),
    };
    let app = app(state);

    let addr = config.addr()?;
    info!(%addr, static_dir = %config.static_dir.display(), "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
