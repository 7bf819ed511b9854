use crate::rpc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Unknown resource: {0}")]
    ResourceNotFound(String),

    #[error("Unknown prompt: {0}")]
    PromptNotFound(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error("Handler error: {0}")]
    Handler(String),

    /// Error raised by a handler that wants a specific JSON-RPC code
    /// surfaced to the client.
    #[error("{message}")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Timeout error")]
    Timeout,
}

impl Error {
    /// Construct a protocol error carrying an explicit JSON-RPC code.
    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        Error::Protocol {
            code,
            message: message.into(),
        }
    }

    /// JSON-RPC error code this error surfaces as.
    pub fn code(&self) -> i64 {
        match self {
            Error::ToolNotFound(_) | Error::ResourceNotFound(_) | Error::PromptNotFound(_) => {
                rpc::METHOD_NOT_FOUND
            }
            Error::InvalidParams(_) => rpc::INVALID_PARAMS,
            Error::Protocol { code, .. } => *code,
            _ => rpc::INTERNAL_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
