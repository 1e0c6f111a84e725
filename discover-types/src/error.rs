use thiserror::Error;

/// The five error kinds of the discovery core, named by failure cause
/// rather than by call site: a `configuration-invalid` error always
/// leaves state untouched, a `message-malformed` error is always
/// silent, and so on. See the crate-level docs for the full policy
/// table.
#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("transport error: {0}")]
    TransportIo(String),

    #[error("malformed message: {0}")]
    MessageMalformed(String),

    #[error("operation issued after release")]
    Teardown,
}

pub type DiscoverResult<T> = Result<T, DiscoverError>;
