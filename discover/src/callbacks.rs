//! The nine lifecycle callback kinds of the public API, modeled as
//! closures behind a lock rather than `void *` + function pointer
//! pairs (see the re-architecture guidance on opaque-pointer
//! callbacks).

use std::sync::{Arc, Mutex};

use discover_types::{DiscoverError, HelloData, PeerInfo};

pub type PeerCallback = Arc<dyn Fn(&PeerInfo) + Send + Sync>;
pub type HelloEmittedCallback = Arc<dyn Fn(&HelloData) + Send + Sync>;
pub type UnitCallback = Arc<dyn Fn() + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
pub struct Callbacks {
    hello_received: Mutex<Option<PeerCallback>>,
    hello_emitted: Mutex<Option<HelloEmittedCallback>>,
    promotion: Mutex<Option<UnitCallback>>,
    demotion: Mutex<Option<UnitCallback>>,
    check: Mutex<Option<UnitCallback>>,
    added: Mutex<Option<PeerCallback>>,
    master: Mutex<Option<PeerCallback>>,
    removed: Mutex<Option<PeerCallback>>,
    error: Mutex<Option<ErrorCallback>>,
}

macro_rules! slot {
    ($field:ident, $setter:ident, $firer:ident, $cb:ty, $($arg:ident : $arg_ty:ty),*) => {
        pub fn $setter(&self, cb: $cb) {
            *self.$field.lock().unwrap() = Some(cb);
        }

        pub fn $firer(&self, $($arg: $arg_ty),*) {
            if let Some(cb) = self.$field.lock().unwrap().clone() {
                cb($($arg),*);
            }
        }
    };
}

impl Callbacks {
    slot!(hello_received, set_hello_received, fire_hello_received, PeerCallback, peer: &PeerInfo);
    slot!(hello_emitted, set_hello_emitted, fire_hello_emitted, HelloEmittedCallback, data: &HelloData);
    slot!(promotion, set_promotion, fire_promotion, UnitCallback,);
    slot!(demotion, set_demotion, fire_demotion, UnitCallback,);
    slot!(check, set_check, fire_check, UnitCallback,);
    slot!(added, set_added, fire_added, PeerCallback, peer: &PeerInfo);
    slot!(master, set_master, fire_master, PeerCallback, peer: &PeerInfo);
    slot!(removed, set_removed, fire_removed, PeerCallback, peer: &PeerInfo);
    slot!(error, set_error, fire_error, ErrorCallback, message: &str);
}

/// The nine topic names of the public `on(topic, cb)` surface.
pub const TOPICS: &[&str] = &[
    "helloReceived",
    "helloEmitted",
    "promotion",
    "demotion",
    "check",
    "added",
    "master",
    "removed",
    "error",
];

pub fn is_known_topic(topic: &str) -> Result<(), DiscoverError> {
    if TOPICS.contains(&topic) {
        Ok(())
    } else {
        Err(DiscoverError::ConfigurationInvalid(format!(
            "unknown callback topic `{topic}`"
        )))
    }
}

/// A typed callback tagged with the topic it was built for, so
/// [`Callbacks::register`] can reject a mismatched pairing (e.g.
/// `on("promotion", a_peer_callback)`) at the boundary instead of
/// silently storing it under the wrong slot.
pub enum CallbackSlot {
    HelloReceived(PeerCallback),
    HelloEmitted(HelloEmittedCallback),
    Promotion(UnitCallback),
    Demotion(UnitCallback),
    Check(UnitCallback),
    Added(PeerCallback),
    Master(PeerCallback),
    Removed(PeerCallback),
    Error(ErrorCallback),
}

impl CallbackSlot {
    fn topic(&self) -> &'static str {
        match self {
            CallbackSlot::HelloReceived(_) => "helloReceived",
            CallbackSlot::HelloEmitted(_) => "helloEmitted",
            CallbackSlot::Promotion(_) => "promotion",
            CallbackSlot::Demotion(_) => "demotion",
            CallbackSlot::Check(_) => "check",
            CallbackSlot::Added(_) => "added",
            CallbackSlot::Master(_) => "master",
            CallbackSlot::Removed(_) => "removed",
            CallbackSlot::Error(_) => "error",
        }
    }
}

impl Callbacks {
    /// Register a callback under its own topic, verifying `topic`
    /// names the slot the caller actually built. This is what backs
    /// the public, string-keyed `Instance::on(topic, cb)`.
    pub fn register(&self, topic: &str, slot: CallbackSlot) -> Result<(), DiscoverError> {
        if topic != slot.topic() {
            return Err(DiscoverError::ConfigurationInvalid(format!(
                "callback built for topic `{}` registered under `{topic}`",
                slot.topic()
            )));
        }
        match slot {
            CallbackSlot::HelloReceived(cb) => self.set_hello_received(cb),
            CallbackSlot::HelloEmitted(cb) => self.set_hello_emitted(cb),
            CallbackSlot::Promotion(cb) => self.set_promotion(cb),
            CallbackSlot::Demotion(cb) => self.set_demotion(cb),
            CallbackSlot::Check(cb) => self.set_check(cb),
            CallbackSlot::Added(cb) => self.set_added(cb),
            CallbackSlot::Master(cb) => self.set_master(cb),
            CallbackSlot::Removed(cb) => self.set_removed(cb),
            CallbackSlot::Error(cb) => self.set_error(cb),
        }
        Ok(())
    }
}
