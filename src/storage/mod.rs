pub mod report_file;

use std::path::PathBuf;
use thiserror::Error;

pub use report_file::{read_report, write_report};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("report file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
