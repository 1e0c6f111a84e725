//! Regex-keyed pub/sub on non-reserved event names, layered on the
//! same wire format as hello datagrams.

use std::sync::Arc;

use discover_types::DiscoverError;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tokio::sync::Mutex;

/// Invoked with `(event, payload, user_data)` for every binding whose
/// pattern matches an inbound event. `user_data` mirrors the reference
/// API's opaque pointer; most callers capture what they need in the
/// closure instead and leave this `None`.
pub type ChannelCallback = Arc<dyn Fn(&str, &Value, Option<&Value>) + Send + Sync>;

struct Binding {
    pattern: Regex,
    callback: ChannelCallback,
    user_data: Option<Value>,
}

/// The reserved event name that bypasses this registry entirely.
pub const HELLO_EVENT: &str = "hello";

pub struct ChannelRegistry {
    bindings: Mutex<IndexMap<String, Binding>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            bindings: Mutex::new(IndexMap::new()),
        }
    }

    /// Re-subscribing the same event string replaces its callback and
    /// user data in place.
    pub async fn join(
        &self,
        event: &str,
        callback: ChannelCallback,
        user_data: Option<Value>,
    ) -> Result<(), DiscoverError> {
        if event == HELLO_EVENT {
            return Err(DiscoverError::ConfigurationInvalid(
                "\"hello\" is reserved and cannot be joined".to_string(),
            ));
        }
        let pattern = Regex::new(event).map_err(|e| {
            DiscoverError::ConfigurationInvalid(format!("invalid channel pattern `{event}`: {e}"))
        })?;
        self.bindings.lock().await.insert(
            event.to_string(),
            Binding {
                pattern,
                callback,
                user_data,
            },
        );
        Ok(())
    }

    pub async fn leave(&self, event: &str) {
        self.bindings.lock().await.shift_remove(event);
    }

    /// A binding matches when its pattern matches anywhere in the
    /// literal inbound event string (not anchored).
    pub async fn dispatch(&self, event: &str, payload: &Value) {
        if event == HELLO_EVENT {
            return;
        }
        let bindings = self.bindings.lock().await;
        for binding in bindings.values() {
            if binding.pattern.is_match(event) {
                (binding.callback)(event, payload, binding.user_data.as_ref());
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.bindings.lock().await.len()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
