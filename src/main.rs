use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use banmap::api;
use banmap::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Arc::new(Config::load(None)?);
    info!("Loaded configuration");
    info!(
        "📜 Watching jail '{}' in {}",
        config.settings.jail_name,
        config.paths.log_file.display()
    );
    info!("💾 Reports stored at {}", config.paths.output_json.display());

    if let Some(ref static_dir) = config.paths.static_dir {
        info!("🎨 Serving frontend from directory: {}", static_dir.display());
    } else {
        info!("🎨 No frontend directory configured, serving JSON endpoints only");
    }

    let app = api::create_api_router(Arc::clone(&config));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Dashboard listening on http://{}", addr);
    info!("   - Report data at http://{}/data", addr);
    info!("   - Trigger a refresh with POST http://{}/refresh", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
