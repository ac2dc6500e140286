use thiserror::Error;

pub type Result<T> = std::result::Result<T, HoundError>;

#[derive(Debug, Error)]
pub enum HoundError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("invalid port \"{0}\"")]
    InvalidPort(String),
    #[error("invalid output path: {0}")]
    InvalidOutputPath(String),
    #[error("no cached resolves found, please run `weibo-image-hound cache` first")]
    NoCachedResolves,
    #[error("all {attempts} attempts across {variants} variants failed")]
    AllVariantsExhausted { variants: usize, attempts: usize },
    #[error("provider error: {0}")]
    Provider(String),
    #[error("storage error during {operation}: {reason}")]
    Storage { operation: String, reason: String },
    #[error("{0}")]
    Other(String),
}

impl HoundError {
    pub fn provider_error(reason: impl Into<String>) -> Self {
        HoundError::Provider(reason.into())
    }

    pub fn storage_error(operation: &str, reason: &str) -> Self {
        HoundError::Storage {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

/* Conversions so `?` works smoothly */
impl From<std::io::Error> for HoundError {
    fn from(e: std::io::Error) -> Self {
        HoundError::Other(e.to_string())
    }
}
impl From<serde_json::Error> for HoundError {
    fn from(e: serde_json::Error) -> Self {
        HoundError::Other(e.to_string())
    }
}
impl From<reqwest::Error> for HoundError {
    fn from(e: reqwest::Error) -> Self {
        HoundError::Provider(e.to_string())
    }
}
