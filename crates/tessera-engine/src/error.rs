//! Error types for the driver binary.
//!
//! [`AppError`] wraps every failure mode of startup, seeding, the run, and
//! the final export, so `main` can propagate with `?`.

/// Top-level error for the driver binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: tessera_core::config::ConfigError,
    },

    /// The configured rule could not be built.
    #[error("rule error: {source}")]
    Rule {
        /// The underlying rule error.
        #[from]
        source: tessera_rules::RuleError,
    },

    /// The configured region is unusable.
    #[error("selection error: {source}")]
    Selection {
        /// The underlying selection error.
        #[from]
        source: tessera_types::SelectionError,
    },

    /// The seed pattern could not be read or written.
    #[error("RLE error: {source}")]
    Rle {
        /// The underlying codec error.
        #[from]
        source: tessera_core::rle::RleError,
    },

    /// The soup settings are unusable.
    #[error("soup error: {source}")]
    Soup {
        /// The underlying soup error.
        #[from]
        source: tessera_core::soup::SoupError,
    },

    /// The engine rejected the seed pattern.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: tessera_core::engine::EngineError,
    },

    /// The stepping loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: tessera_core::runner::RunnerError,
    },

    /// Reading the seed file or writing the output failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },

    /// Serializing a result failed.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}
