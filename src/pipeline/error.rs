use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required file '{key}' not found at: {}", path.display())]
    MissingInput { key: &'static str, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid ban pattern for jail '{jail}': {source}")]
    Pattern {
        jail: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to open GeoIP database at {}: {source}", path.display())]
    Database {
        path: PathBuf,
        #[source]
        source: maxminddb::MaxMindDbError,
    },

    #[error("GeoIP lookup failed for {ip}: {source}")]
    Lookup {
        ip: String,
        #[source]
        source: maxminddb::MaxMindDbError,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
