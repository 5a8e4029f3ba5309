//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: mason_core::config::ConfigError,
    },

    /// The demo plan could not be assembled.
    #[error("plan error: {source}")]
    Plan {
        /// The underlying plan error.
        #[from]
        source: mason_world::PlanError,
    },

    /// The build ended abnormally.
    #[error("build error: {source}")]
    Build {
        /// The underlying build error.
        #[from]
        source: mason_core::BuildError,
    },
}
