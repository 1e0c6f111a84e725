//! Decentralized peer discovery and weighted master election over UDP,
//! wire-compatible with the reference hello-datagram protocol. No
//! election messages are sent; every peer converges on the same
//! outcome by applying the same rule to the same locally observed
//! state.

pub mod callbacks;
pub mod channels;
pub mod check_loop;
pub mod dispatcher;
pub mod election;
pub mod hello;
pub mod inbound_queue;
pub mod instance;
pub mod peer_table;
pub mod state;

pub use callbacks::{CallbackSlot, Callbacks, ErrorCallback, HelloEmittedCallback, PeerCallback, UnitCallback};
pub use channels::{ChannelCallback, ChannelRegistry, HELLO_EVENT};
pub use election::ElectionDecision;
pub use instance::Instance;
pub use peer_table::{PeerSummary, PeerTable, UpsertOutcome};
pub use state::InstanceState;

pub use discover_types::{
    default_weight, local_hostname, new_v4_id, DiscoverError, DiscoverResult, Envelope, HelloData,
    OptionValue, Options, OptionsBuilder, PeerData, PeerInfo, PeerKey, TransportMode,
};
pub use discover_transport::{BindConfig, BindMode, Transport, TransportError, UdpTransport};
