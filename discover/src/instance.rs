//! Public API surface: the thing a caller constructs, starts, and
//! releases. Ties the transport, peer table, channel registry and
//! callbacks together and runs the background loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{Context, Result};
use discover_transport::{BindConfig, BindMode, Transport, UdpTransport};
use discover_types::{DiscoverError, Envelope, OptionValue, Options, PeerInfo, TransportMode};
use serde_json::Value;
use tokio::sync::{watch, Mutex as TokioMutex};
use tokio::task::JoinHandle;

use crate::callbacks::{CallbackSlot, Callbacks};
use crate::channels::{ChannelCallback, ChannelRegistry, HELLO_EVENT};
use crate::check_loop;
use crate::dispatcher::{self, DispatchContext};
use crate::hello;
use crate::inbound_queue::InboundQueue;
use crate::peer_table::PeerTable;
use crate::state::InstanceState;

/// Capacity of the bounded queue sitting between the transport's
/// message callback and the dispatcher task. Oldest datagram dropped
/// on overflow; see [`InboundQueue`].
const INBOUND_QUEUE_CAPACITY: usize = 1024;

type InboundItem = (String, u16, Vec<u8>);

/// A running (or not-yet-started) discovery instance. Every subsystem
/// it owns is `Arc`-shared internally, so background tasks never need
/// a handle back to `Instance` itself.
pub struct Instance {
    options: Arc<StdMutex<Options>>,
    state: Arc<InstanceState>,
    peers: Arc<PeerTable>,
    channels: Arc<ChannelRegistry>,
    callbacks: Arc<Callbacks>,
    transport: StdMutex<Option<Arc<dyn Transport>>>,
    shutdown_tx: StdMutex<Option<watch::Sender<bool>>>,
    tasks: TokioMutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    released: AtomicBool,
}

impl Instance {
    /// Build an instance from validated options. Does not bind a
    /// socket or spawn any task; call [`Instance::start`] for that.
    pub fn create(options: Options) -> Result<Self> {
        Self::create_with_process_id(options, None)
    }

    /// As [`Instance::create`], but pins `processId` instead of
    /// generating one. Useful for tests that need a stable identity
    /// across restarts; `instanceId` is always freshly generated.
    pub fn create_with_process_id(options: Options, process_id: Option<String>) -> Result<Self> {
        options.validate()?;
        if options.masters_required == 0 {
            tracing::warn!("mastersRequired is 0: this instance can never be promoted to master");
        }
        Ok(Self {
            state: Arc::new(InstanceState::new(process_id)),
            options: Arc::new(StdMutex::new(options)),
            peers: Arc::new(PeerTable::new()),
            channels: Arc::new(ChannelRegistry::new()),
            callbacks: Arc::new(Callbacks::default()),
            transport: StdMutex::new(None),
            shutdown_tx: StdMutex::new(None),
            tasks: TokioMutex::new(Vec::new()),
            started: AtomicBool::new(false),
            released: AtomicBool::new(false),
        })
    }

    fn ensure_alive(&self) -> Result<(), DiscoverError> {
        if self.released.load(Ordering::SeqCst) {
            Err(DiscoverError::Teardown)
        } else {
            Ok(())
        }
    }

    pub fn set_option(&self, name: &str, value: OptionValue) -> Result<()> {
        self.ensure_alive()?;
        self.options.lock().unwrap().set_option(name, value)?;
        Ok(())
    }

    pub fn get_option(&self, name: &str) -> Option<OptionValue> {
        self.options.lock().unwrap().get_option(name)
    }

    /// Binds the transport and spawns the dispatch, hello (unless
    /// `client`) and check loop tasks. Idempotent: a second call on an
    /// already-started instance is a no-op.
    pub async fn start(&self) -> Result<()> {
        self.ensure_alive()?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (address, port, reuse_addr, mode, client) = {
            let opts = self.options.lock().unwrap();
            (opts.address.clone(), opts.port, opts.reuse_addr, opts.transport_mode(), opts.client)
        };
        let bind_mode = match mode {
            TransportMode::Broadcast(destination) => BindMode::Broadcast { destination },
            TransportMode::Multicast(group) => {
                let ttl = self.options.lock().unwrap().multicast_ttl;
                BindMode::Multicast { group, ttl }
            }
            TransportMode::Unicast(destinations) => BindMode::Unicast { destinations },
        };

        let transport: Arc<dyn Transport> = match UdpTransport::bind(BindConfig {
            address,
            port,
            mode: bind_mode,
            reuse_addr,
        })
        .await
        {
            Ok(t) => t,
            Err(e) => {
                // transport-io on bind: both a fired `error` callback and a failed start.
                self.callbacks.fire_error(&e.to_string());
                self.started.store(false, Ordering::SeqCst);
                return Err(e).context("failed to bind discovery transport");
            }
        };

        let inbound: Arc<InboundQueue<InboundItem>> = Arc::new(InboundQueue::new(INBOUND_QUEUE_CAPACITY));
        {
            let inbound = Arc::clone(&inbound);
            let callbacks = Arc::clone(&self.callbacks);
            transport.on_message(Arc::new(move |ip, port, bytes| {
                if inbound.push((ip, port, bytes)) {
                    callbacks.fire_error("inbound queue full: dropped oldest datagram");
                }
            }));
        }
        {
            let callbacks = Arc::clone(&self.callbacks);
            transport.on_error(Arc::new(move |message| {
                callbacks.fire_error(&message);
            }));
        }

        *self.transport.lock().unwrap() = Some(Arc::clone(&transport));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.shutdown_tx.lock().unwrap() = Some(shutdown_tx);

        let mut tasks = Vec::new();

        let dispatch_ctx = Arc::new(DispatchContext {
            peers: Arc::clone(&self.peers),
            channels: Arc::clone(&self.channels),
            callbacks: Arc::clone(&self.callbacks),
            state: Arc::clone(&self.state),
            options: Arc::clone(&self.options),
        });
        tasks.push(tokio::spawn(run_dispatch_loop(inbound, dispatch_ctx, shutdown_rx.clone())));

        if !client {
            tasks.push(tokio::spawn(hello::run(
                Arc::clone(&transport),
                Arc::clone(&self.options),
                Arc::clone(&self.state),
                Arc::clone(&self.callbacks),
                shutdown_rx.clone(),
            )));
        }
        tasks.push(tokio::spawn(check_loop::run(
            Arc::clone(&self.peers),
            Arc::clone(&self.options),
            Arc::clone(&self.state),
            Arc::clone(&self.callbacks),
            shutdown_rx,
        )));
        *self.tasks.lock().await = tasks;

        Ok(())
    }

    /// Stops the loops, releases the transport. Idempotent; every
    /// other public method rejects with [`DiscoverError::Teardown`]
    /// once this has run.
    pub async fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(tx) = self.shutdown_tx.lock().unwrap().take() {
            let _ = tx.send(true);
        }
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            let _ = task.await;
        }
        if let Some(transport) = self.transport.lock().unwrap().take() {
            transport.release().await;
        }
        Ok(())
    }

    pub fn on(&self, topic: &str, slot: CallbackSlot) -> Result<()> {
        self.ensure_alive()?;
        self.callbacks.register(topic, slot)?;
        Ok(())
    }

    pub fn advertise(&self, value: Option<Value>) -> Result<()> {
        self.ensure_alive()?;
        self.options.lock().unwrap().advertisement = value;
        Ok(())
    }

    /// Makes this instance master immediately, bypassing the election
    /// rule. Does not fire `promotion`/`demotion` — those are reserved
    /// for transitions the check loop itself decides.
    pub fn promote(&self) -> Result<()> {
        self.ensure_alive()?;
        self.state.promote();
        Ok(())
    }

    pub fn demote(&self, permanent: bool) -> Result<()> {
        self.ensure_alive()?;
        self.state.demote(permanent);
        Ok(())
    }

    pub async fn join(&self, event: &str, callback: ChannelCallback, user_data: Option<Value>) -> Result<()> {
        self.ensure_alive()?;
        self.channels.join(event, callback, user_data).await?;
        Ok(())
    }

    pub async fn leave(&self, event: &str) -> Result<()> {
        self.ensure_alive()?;
        self.channels.leave(event).await;
        Ok(())
    }

    pub async fn send(&self, event: &str, data: Value) -> Result<()> {
        self.ensure_alive()?;
        if event == HELLO_EVENT {
            return Err(DiscoverError::ConfigurationInvalid(
                "\"hello\" is reserved and cannot be sent as a channel event".to_string(),
            )
            .into());
        }
        let transport = self
            .transport
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| DiscoverError::ConfigurationInvalid("instance not started".to_string()))?;

        let envelope = Envelope {
            event: event.to_string(),
            pid: self.state.process_id.clone(),
            iid: self.state.instance_id.clone(),
            host_name: self.options.lock().unwrap().hostname.clone(),
            data,
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| DiscoverError::MessageMalformed(e.to_string()))?;
        transport.send(&bytes).await;
        Ok(())
    }

    pub async fn peers(&self) -> Vec<PeerInfo> {
        self.peers.snapshot().await
    }

    pub fn is_master(&self) -> bool {
        self.state.is_master()
    }

    pub fn is_master_eligible(&self) -> bool {
        self.state.is_master_eligible()
    }

    pub fn process_id(&self) -> &str {
        &self.state.process_id
    }

    pub fn instance_id(&self) -> &str {
        &self.state.instance_id
    }
}

async fn run_dispatch_loop(
    inbound: Arc<InboundQueue<InboundItem>>,
    ctx: Arc<DispatchContext>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return;
                }
            }
            (ip, port, bytes) = inbound.pop() => {
                dispatcher::handle_datagram(&ctx, ip, port, bytes).await;
            }
        }
    }
}
