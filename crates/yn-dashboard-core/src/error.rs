use thiserror::Error;
use yn_chain_client::ChainError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("cannot format rate {rate:?}: {reason}")]
    Formatting { rate: String, reason: String },
}

pub type Result<T> = std::result::Result<T, FetchError>;
