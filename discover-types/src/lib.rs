//! Shared data model for the peer-discovery and master-election core:
//! the wire schema, the configuration table, and the peer-record shape
//! handed to user callbacks. No I/O lives here.

pub mod error;
pub mod identity;
pub mod options;
pub mod peer;
pub mod wire;

pub use error::{DiscoverError, DiscoverResult};
pub use identity::{default_weight, local_hostname, new_v4_id};
pub use options::{Options, OptionsBuilder, OptionValue, TransportMode};
pub use peer::{PeerData, PeerInfo, PeerKey};
pub use wire::{Envelope, HelloData};
