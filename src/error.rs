//! Error types for setup and loading
//!
//! Only configuration, catalog, replay and model loading return these.
//! The per-tick path never propagates errors: classifier failures collapse to
//! `Inconclusive` at the gate and rendering failures are logged.

/// Result type alias for the trainer
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Error types for the trainer
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pose catalog error: {0}")]
    Catalog(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Replay error: {0}")]
    Replay(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Weights decode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),
}
