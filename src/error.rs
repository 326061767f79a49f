//! Errors raised at the I/O edges. The processing core itself cannot fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("capture line {line}: timestamp {t_ms} goes backwards")]
    OutOfOrder { line: usize, t_ms: u64 },
}
