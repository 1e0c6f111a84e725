use thiserror::Error;

/// Transport-io failures (spec error kind `transport-io`). Bind/option
/// failures are fatal to the transport; send/receive failures are
/// logged and the loop continues.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("failed to bind socket: {0}")]
    Bind(String),
    #[error("failed to set socket option: {0}")]
    SetOption(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Recv(String),
}
