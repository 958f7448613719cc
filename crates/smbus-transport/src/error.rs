use thiserror::Error;

pub type Result<T, E = TransportError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("device did not acknowledge")]
    Nack,
    #[error("timeout")]
    Timeout,
    #[error("bus busy")]
    Busy,
    #[error("interface not found: {0}")]
    NotFound(String),
    #[error("operation not supported on this backend: {0}")]
    Unsupported(&'static str),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
