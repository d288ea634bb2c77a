use crate::types::Platform;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Authentication failed for {platform}")]
    Authentication { platform: Platform },

    #[error("Adapter is not authenticated")]
    NotAuthenticated,

    #[error("Failed to secure credentials")]
    CredentialEncryption,

    #[error("Failed to decrypt credentials")]
    CredentialDecryption,

    #[error("Failed to retrieve credentials")]
    CredentialRetrieval,

    #[error("No integration found for {platform}")]
    IntegrationNotFound { platform: Platform },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Transport(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
