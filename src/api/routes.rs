use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::config::Config;

use super::handlers::{get_data, health_check, refresh_data, AppState};

pub fn create_api_router(config: Arc<Config>) -> Router {
    let static_dir = config.paths.static_dir.clone();
    let state = Arc::new(AppState::new(config));

    let router = Router::new()
        .route("/data", get(get_data))
        .route("/refresh", post(refresh_data))
        .route("/health", get(health_check))
        .with_state(state);

    // Dashboard front-end, `/` resolves to index.html
    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}
