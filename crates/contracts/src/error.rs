use thiserror::Error;

/// Failure to obtain a configuration document. Values inside a document are
/// never an error; they are clamped by `normalized()`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid seed {raw:?}: {reason}")]
    Seed { raw: String, reason: String },
}
