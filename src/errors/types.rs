use thiserror::Error;

/// Message carried by [`HarvesterError::NoProvidersAvailable`].
pub const NO_PROVIDERS_MESSAGE: &str = "No providers available for the selected lookup types";

#[derive(Debug, Error)]
pub enum HarvesterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("{}", NO_PROVIDERS_MESSAGE)]
    NoProvidersAvailable,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for HarvesterError {
    fn from(e: rusqlite::Error) -> Self {
        HarvesterError::Storage(e.to_string())
    }
}
