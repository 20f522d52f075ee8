use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("working directory does not exist: {}", .0.display())]
    MissingWorkingDir(PathBuf),

    #[error("no config directory available on this platform")]
    NoConfigDir,

    #[error("probe to {target} failed: {source}")]
    Probe {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("probe to {0} timed out")]
    ProbeTimeout(String),

    #[error("unexpected packet from server: {0}")]
    BadPacket(&'static str),

    #[error("async runtime unavailable: {0}")]
    Runtime(String),
}
