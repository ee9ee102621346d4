use thiserror::Error;

/// Errors produced by the minedive relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("no peer available")]
    NoPeerAvailable,

    #[error("picked the requesting client as its own peer")]
    SamePeerSelected,

    #[error("malformed alias: {0}")]
    MalformedAlias(String),

    #[error("alias decryption failed")]
    DecryptionFailed,

    #[error("client used its own name as gateway")]
    SelfGateway,

    #[error("gateway nonce space exhausted")]
    NonceExhausted,

    #[error("client id space exhausted")]
    IdsExhausted,

    #[error("alias sealing failed: {0}")]
    SealFailed(String),

    #[error("secure random source unavailable")]
    EntropyUnavailable,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::MalformedMessage(e.to_string())
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
