use std::any::Any;
use thiserror::Error;

/// Failures raised while producing a handler response
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed request target '{target}': {source}")]
    MalformedUrl {
        target: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid response header '{name}'")]
    InvalidHeader { name: String },

    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Failure reported by the compute function itself
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }

    /// Convert a payload caught by `catch_unwind`
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::Panicked(message)
    }
}
