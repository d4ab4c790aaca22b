//! Shared error type for Palaver.
//!
//! Transport-specific failures (HTTP, WebSocket) live in the client crate;
//! this covers what every layer can produce.

/// Core error type used across Palaver crates.
#[derive(Debug, thiserror::Error)]
pub enum PalaverError {
    // === Validation errors ===
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // === Configuration errors ===
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PalaverError {
    /// Error code string for programmatic handling by embedding UIs.
    pub fn error_code(&self) -> &str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Text safe to show in the UI. Internal details are logged, not shown.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => {
                tracing::error!("Configuration error: {e}");
                "The client is misconfigured".to_string()
            }
            Self::Internal(e) => {
                tracing::error!("Internal error: {e}");
                "An internal error occurred".to_string()
            }
            Self::Validation { message } => message.clone(),
        }
    }
}


/// Convenience type alias for Results using PalaverError.
pub type PalaverResult<T> = Result<T, PalaverError>;
