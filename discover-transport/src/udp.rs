use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::{BindConfig, BindMode};
use crate::error::TransportError;
use crate::{ErrorCallback, MessageCallback, Transport};

/// Ceiling on the listener's blocking wait, so `release()` is never
/// more than this long from observing the shutdown signal.
const RECV_WAIT_CEILING: Duration = Duration::from_secs(5);
const MAX_DATAGRAM: usize = 64 * 1024;

/// UDP implementation of [`Transport`]. One bound socket per instance;
/// the routing mode only changes where `send` fans out to, never how
/// the socket is read.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    mode: BindMode,
    message_cb: StdMutex<Option<MessageCallback>>,
    error_cb: StdMutex<Option<ErrorCallback>>,
    shutdown_tx: watch::Sender<bool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl UdpTransport {
    pub async fn bind(config: BindConfig) -> Result<Arc<Self>, TransportError> {
        let bind_addr: SocketAddr = format!("{}:{}", config.address, config.port)
            .parse()
            .map_err(|e| TransportError::Bind(format!("invalid bind address: {e}")))?;

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| TransportError::Bind(e.to_string()))?;

        if config.reuse_addr {
            socket
                .set_reuse_address(true)
                .map_err(|e| TransportError::SetOption(format!("SO_REUSEADDR: {e}")))?;
        }

        if matches!(config.mode, BindMode::Broadcast { .. }) {
            socket
                .set_broadcast(true)
                .map_err(|e| TransportError::SetOption(format!("SO_BROADCAST: {e}")))?;
        }

        socket
            .bind(&bind_addr.into())
            .map_err(|e| TransportError::Bind(e.to_string()))?;

        if let BindMode::Multicast { group, ttl } = &config.mode {
            let group_addr = Ipv4Addr::from_str(group)
                .map_err(|e| TransportError::SetOption(format!("bad multicast group: {e}")))?;
            let iface = Ipv4Addr::from_str(&config.address).unwrap_or(Ipv4Addr::UNSPECIFIED);
            socket
                .join_multicast_v4(&group_addr, &iface)
                .map_err(|e| TransportError::SetOption(format!("join multicast: {e}")))?;
            socket
                .set_multicast_ttl_v4(*ttl as u32)
                .map_err(|e| TransportError::SetOption(format!("multicast TTL: {e}")))?;
        }

        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::Bind(e.to_string()))?;

        let std_socket: std::net::UdpSocket = socket.into();
        let tokio_socket =
            UdpSocket::from_std(std_socket).map_err(|e| TransportError::Bind(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let transport = Arc::new(Self {
            socket: Arc::new(tokio_socket),
            mode: config.mode,
            message_cb: StdMutex::new(None),
            error_cb: StdMutex::new(None),
            shutdown_tx,
            listener: Mutex::new(None),
        });

        let handle = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { transport.listen(shutdown_rx).await })
        };
        *transport.listener.lock().await = Some(handle);

        Ok(transport)
    }

    async fn listen(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            if *shutdown_rx.borrow() {
                return;
            }
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        return;
                    }
                }
                res = tokio::time::timeout(RECV_WAIT_CEILING, self.socket.recv_from(&mut buf)) => {
                    match res {
                        Err(_elapsed) => continue,
                        Ok(Ok((len, src))) if len > 0 => {
                            let payload = buf[..len].to_vec();
                            if let Some(cb) = self.message_cb.lock().unwrap().clone() {
                                let ip = src.ip().to_string();
                                let port = src.port();
                                tokio::spawn(async move { cb(ip, port, payload) });
                            }
                        }
                        Ok(Ok(_)) => continue, // short read, skipped silently
                        Ok(Err(e)) => {
                            warn!("udp recv error: {e}");
                            if let Some(cb) = self.error_cb.lock().unwrap().clone() {
                                cb(format!("recv error: {e}"));
                            }
                        }
                    }
                }
            }
        }
    }

    fn destination_addrs(&self, local_port: u16) -> Vec<String> {
        let with_port = |host: &str| {
            if host.contains(':') {
                host.to_string()
            } else {
                format!("{host}:{local_port}")
            }
        };
        match &self.mode {
            BindMode::Broadcast { destination } => vec![with_port(destination)],
            BindMode::Multicast { group, .. } => vec![with_port(group)],
            BindMode::Unicast { destinations } => destinations.iter().map(|d| with_port(d)).collect(),
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn on_message(&self, cb: MessageCallback) {
        *self.message_cb.lock().unwrap() = Some(cb);
    }

    fn on_error(&self, cb: ErrorCallback) {
        *self.error_cb.lock().unwrap() = Some(cb);
    }

    async fn send(&self, bytes: &[u8]) {
        let local_port = match self.socket.local_addr() {
            Ok(addr) => addr.port(),
            Err(e) => {
                warn!("udp send: local_addr unavailable: {e}");
                if let Some(cb) = self.error_cb.lock().unwrap().clone() {
                    cb(format!("send failed: local_addr unavailable: {e}"));
                }
                return;
            }
        };
        for dest in self.destination_addrs(local_port) {
            if let Err(e) = self.socket.send_to(bytes, &dest).await {
                // Best-effort UDP: per-destination failures are swallowed,
                // not surfaced through the error callback.
                warn!("udp send to {dest} failed: {e}");
            }
        }
    }

    async fn release(&self) {
        let _ = self.shutdown_tx.send(true);
        // Leave the multicast group before dropping the socket; some OS
        // network stacks keep a membership alive otherwise.
        if let BindMode::Multicast { group, .. } = &self.mode {
            if let Ok(group_addr) = Ipv4Addr::from_str(group) {
                let sock_ref = SockRef::from(&*self.socket);
                if let Err(e) = sock_ref.leave_multicast_v4(&group_addr, &Ipv4Addr::UNSPECIFIED) {
                    warn!("failed to leave multicast group {group}: {e}");
                }
            }
        }
        if let Some(handle) = self.listener.lock().await.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn free_port() -> u16 {
        std::net::UdpSocket::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test]
    async fn unicast_round_trip() {
        let port_a = free_port();
        let port_b = free_port();

        let a = UdpTransport::bind(BindConfig {
            address: "127.0.0.1".to_string(),
            port: port_a,
            mode: BindMode::Unicast {
                destinations: vec![format!("127.0.0.1:{port_b}")],
            },
            reuse_addr: true,
        })
        .await
        .unwrap();

        let b = UdpTransport::bind(BindConfig {
            address: "127.0.0.1".to_string(),
            port: port_b,
            mode: BindMode::Unicast {
                destinations: vec![format!("127.0.0.1:{port_a}")],
            },
            reuse_addr: true,
        })
        .await
        .unwrap();

        let received = Arc::new(AtomicUsize::new(0));
        let received_cb = Arc::clone(&received);
        b.on_message(Arc::new(move |_ip, _port, payload| {
            assert_eq!(payload, b"hello");
            received_cb.fetch_add(1, Ordering::SeqCst);
        }));

        a.send(b"hello").await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(received.load(Ordering::SeqCst), 1);

        a.release().await;
        b.release().await;
    }

    #[tokio::test]
    async fn empty_unicast_list_sends_nothing_and_does_not_panic() {
        let port = free_port();
        let t = UdpTransport::bind(BindConfig {
            address: "127.0.0.1".to_string(),
            port,
            mode: BindMode::Unicast {
                destinations: vec![],
            },
            reuse_addr: true,
        })
        .await
        .unwrap();
        t.send(b"nobody home").await;
        t.release().await;
    }

    #[tokio::test]
    async fn malformed_datagram_does_not_crash_listener() {
        let port_a = free_port();
        let port_b = free_port();

        let a = UdpTransport::bind(BindConfig {
            address: "127.0.0.1".to_string(),
            port: port_a,
            mode: BindMode::Unicast {
                destinations: vec![format!("127.0.0.1:{port_b}")],
            },
            reuse_addr: true,
        })
        .await
        .unwrap();
        let b = UdpTransport::bind(BindConfig {
            address: "127.0.0.1".to_string(),
            port: port_b,
            mode: BindMode::Unicast {
                destinations: vec![format!("127.0.0.1:{port_a}")],
            },
            reuse_addr: true,
        })
        .await
        .unwrap();

        let received = Arc::new(AtomicUsize::new(0));
        let received_cb = Arc::clone(&received);
        b.on_message(Arc::new(move |_ip, _port, _payload| {
            received_cb.fetch_add(1, Ordering::SeqCst);
        }));

        a.send(b"not json").await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        // Transport itself has no notion of JSON; it still delivers the bytes.
        // Parsing, and dropping malformed payloads, is the dispatcher's job.
        assert_eq!(received.load(Ordering::SeqCst), 1);

        a.release().await;
        b.release().await;
    }
}
