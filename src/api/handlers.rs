use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::{error, info};

use crate::config::{Config, DashboardView};
use crate::pipeline;
use crate::storage::{read_report, write_report};

pub struct AppState {
    pub config: Arc<Config>,
    /// Held for the duration of a refresh so concurrent requests queue up
    /// instead of geolocating the same log twice
    pub refresh_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    Success,
    Noop,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub status: RefreshStatus,
    pub message: String,
}

/// Stored report plus the map view settings
#[derive(Debug, Serialize)]
pub struct DataResponse {
    #[serde(flatten)]
    pub report: serde_json::Map<String, Value>,
    pub server_config: DashboardView,
}

/// Latest report with the dashboard view configuration
pub async fn get_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse>, (StatusCode, Json<ErrorResponse>)> {
    let path = state.config.paths.output_json.clone();
    let stored = tokio::task::spawn_blocking(move || read_report(&path))
        .await
        .map_err(|e| internal_error(format!("Report reader task failed: {}", e)))?
        .map_err(|e| internal_error(format!("Failed to read report: {}", e)))?;

    let report = match stored {
        Some(Value::Object(report)) => report,
        Some(_) => return Err(internal_error("Stored report is not a JSON object".to_string())),
        None => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Data file not found. Please refresh data first.".to_string(),
                }),
            ))
        }
    };

    Ok(Json(DataResponse {
        report,
        server_config: state.config.dashboard_view(),
    }))
}

/// Regenerate the report from today's log
pub async fn refresh_data(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RefreshResponse>) {
    let config = Arc::clone(&state.config);
    let outcome = run_exclusive(Arc::clone(&state.refresh_lock), move || {
        refresh_report(&config)
    })
    .await;

    match outcome {
        Ok(Ok(true)) => (
            StatusCode::OK,
            Json(RefreshResponse {
                status: RefreshStatus::Success,
                message: "Data refreshed successfully.".to_string(),
            }),
        ),
        Ok(Ok(false)) => (
            StatusCode::OK,
            Json(RefreshResponse {
                status: RefreshStatus::Noop,
                message: "No new data to process.".to_string(),
            }),
        ),
        Ok(Err(e)) => {
            error!("Error during data refresh: {:#}", e);
            refresh_failed(format!("{:#}", e))
        }
        Err(e) => {
            error!("Refresh task failed: {}", e);
            refresh_failed(e.to_string())
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}

/// Run `job` on the blocking pool while holding `lock`
///
/// The guard moves into the blocking task, so the lock stays held until the
/// job returns even if the awaiting request is dropped.
async fn run_exclusive<T, F>(lock: Arc<Mutex<()>>, job: F) -> Result<T, JoinError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let guard = lock.lock_owned().await;
    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        job()
    })
    .await
}

/// Run the pipeline and store its report
///
/// Returns whether a new report was written.
fn refresh_report(config: &Config) -> anyhow::Result<bool> {
    let Some(report) = pipeline::run(&config.pipeline())? else {
        return Ok(false);
    };

    write_report(&config.paths.output_json, &report)?;
    info!(
        "Report written to {}",
        config.paths.output_json.display()
    );
    Ok(true)
}

fn internal_error(error: String) -> (StatusCode, Json<ErrorResponse>) {
    error!("{}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error }),
    )
}

fn refresh_failed(message: String) -> (StatusCode, Json<RefreshResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(RefreshResponse {
            status: RefreshStatus::Error,
            message,
        }),
    )
}
