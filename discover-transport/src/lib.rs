//! UDP datagram transport: binds one endpoint in broadcast, multicast
//! or unicast-list mode and hides the three behind a uniform
//! send/receive contract. No knowledge of the discovery wire format
//! lives here.

pub mod config;
pub mod error;
pub mod udp;

pub use config::{BindConfig, BindMode};
pub use error::TransportError;
pub use udp::UdpTransport;

use async_trait::async_trait;

/// Callback invoked with `(sender_ip, sender_port, payload)` for every
/// inbound datagram. Runs on a task distinct from the listener loop so
/// a slow callback never blocks further receives.
pub type MessageCallback = std::sync::Arc<dyn Fn(String, u16, Vec<u8>) + Send + Sync>;

/// Callback invoked with a human-readable message on catastrophic
/// transport-io failure (bind, required socket option, or a fatal
/// receive error). Not invoked for best-effort per-destination send
/// failures, which are swallowed.
pub type ErrorCallback = std::sync::Arc<dyn Fn(String) + Send + Sync>;

/// Uniform contract over the three routing modes. `send` is
/// fire-and-forget, at-most-once; `release` stops the listener,
/// cancels any in-flight receive and closes the socket.
#[async_trait]
pub trait Transport: Send + Sync {
    fn on_message(&self, cb: MessageCallback);
    fn on_error(&self, cb: ErrorCallback);
    async fn send(&self, bytes: &[u8]);
    async fn release(&self);
}
