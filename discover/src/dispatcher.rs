//! The inbound message dispatcher: parse one datagram, decide whether
//! it updates the peer table or fans out through the channel registry.

use std::sync::{Arc, Mutex as StdMutex};

use discover_types::{Envelope, HelloData, Options, PeerData, PeerKey};

use crate::callbacks::Callbacks;
use crate::channels::ChannelRegistry;
use crate::peer_table::PeerTable;
use crate::state::InstanceState;

pub struct DispatchContext {
    pub peers: Arc<PeerTable>,
    pub channels: Arc<ChannelRegistry>,
    pub callbacks: Arc<Callbacks>,
    pub state: Arc<InstanceState>,
    pub options: Arc<StdMutex<Options>>,
}

/// Steps 1-7 of the message dispatcher, spec-exact. Any parse or
/// missing-field failure returns silently (message-malformed: no
/// callback, no retry).
pub async fn handle_datagram(ctx: &DispatchContext, sender_ip: String, sender_port: u16, bytes: Vec<u8>) {
    let envelope: Envelope = match serde_json::from_slice(&bytes) {
        Ok(e) => e,
        Err(_) => return,
    };

    let (ignore_process, ignore_instance) = {
        let opts = ctx.options.lock().unwrap();
        (opts.ignore_process, opts.ignore_instance)
    };

    if ignore_process && envelope.pid == ctx.state.process_id {
        return;
    }
    if ignore_instance && envelope.iid == ctx.state.instance_id {
        return;
    }

    if envelope.is_hello() {
        let hello: HelloData = match serde_json::from_value(envelope.data.clone()) {
            Ok(h) => h,
            Err(_) => return,
        };

        let key = PeerKey::new(envelope.pid, envelope.iid);
        let data = PeerData {
            is_master: hello.is_master,
            is_master_eligible: hello.is_master_eligible,
            weight: hello.weight,
            address: hello.address,
            advertisement: hello.advertisement,
        };

        let outcome = ctx
            .peers
            .upsert(key, envelope.host_name, sender_ip, sender_port, data)
            .await;

        // `added` strictly precedes `master`/`helloReceived` for this hello.
        if outcome.was_new {
            ctx.callbacks.fire_added(&outcome.record);
        }
        if outcome.record.data.is_master && (outcome.was_new || !outcome.was_master) {
            ctx.callbacks.fire_master(&outcome.record);
        }
        ctx.callbacks.fire_hello_received(&outcome.record);
    } else {
        ctx.channels.dispatch(&envelope.event, &envelope.data).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discover_types::OptionValue;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn context() -> DispatchContext {
        let mut opts = Options::default();
        opts.set_option("ignoreProcess", OptionValue::Bool(true)).unwrap();
        opts.set_option("ignoreInstance", OptionValue::Bool(true)).unwrap();
        DispatchContext {
            peers: Arc::new(PeerTable::new()),
            channels: Arc::new(ChannelRegistry::new()),
            callbacks: Arc::new(Callbacks::default()),
            state: Arc::new(InstanceState::new(Some("local-pid".into()))),
            options: Arc::new(Mutex::new(opts)),
        }
    }

    fn hello_bytes(pid: &str, iid: &str, is_master: bool, weight: f64) -> Vec<u8> {
        let envelope = Envelope {
            event: "hello".to_string(),
            pid: pid.to_string(),
            iid: iid.to_string(),
            host_name: "remote-host".to_string(),
            data: serde_json::to_value(HelloData {
                is_master,
                is_master_eligible: true,
                weight,
                address: "10.0.0.9".to_string(),
                advertisement: None,
            })
            .unwrap(),
        };
        serde_json::to_vec(&envelope).unwrap()
    }

    #[tokio::test]
    async fn hello_from_new_peer_fires_added_then_hello_received() {
        let ctx = context();
        let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));

        let o1 = Arc::clone(&order);
        ctx.callbacks.set_added(Arc::new(move |_p| o1.lock().unwrap().push("added")));
        let o2 = Arc::clone(&order);
        ctx.callbacks
            .set_hello_received(Arc::new(move |_p| o2.lock().unwrap().push("helloReceived")));

        let bytes = hello_bytes("remote-pid", "remote-iid", false, 1.0);
        handle_datagram(&ctx, "10.0.0.9".into(), 12345, bytes).await;

        assert_eq!(*order.lock().unwrap(), vec!["added", "helloReceived"]);
        assert_eq!(ctx.peers.len().await, 1);
    }

    #[tokio::test]
    async fn hello_from_local_instance_is_ignored() {
        let ctx = context();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_cb = Arc::clone(&hits);
        ctx.callbacks.set_added(Arc::new(move |_p| { hits_cb.fetch_add(1, Ordering::SeqCst); }));

        let bytes = hello_bytes("local-pid", ctx.state.instance_id.as_str(), false, 1.0);
        handle_datagram(&ctx, "127.0.0.1".into(), 12345, bytes).await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.peers.len().await, 0);
    }

    #[tokio::test]
    async fn malformed_datagram_is_dropped_silently() {
        let ctx = context();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_cb = Arc::clone(&hits);
        ctx.callbacks.set_error(Arc::new(move |_m| { hits_cb.fetch_add(1, Ordering::SeqCst); }));

        handle_datagram(&ctx, "10.0.0.9".into(), 1, b"not json".to_vec()).await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.peers.len().await, 0);
    }

    #[tokio::test]
    async fn non_hello_event_reaches_channel_registry() {
        let ctx = context();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_cb = Arc::clone(&hits);
        ctx.channels
            .join(r"^sensor\.", Arc::new(move |_e, payload, _u| {
                assert_eq!(payload["celsius"], 21.5);
                hits_cb.fetch_add(1, Ordering::SeqCst);
            }), None)
            .await
            .unwrap();

        let envelope = Envelope {
            event: "sensor.temp".to_string(),
            pid: "remote-pid".to_string(),
            iid: "remote-iid".to_string(),
            host_name: "remote-host".to_string(),
            data: json!({"celsius": 21.5}),
        };
        let bytes = serde_json::to_vec(&envelope).unwrap();
        handle_datagram(&ctx, "10.0.0.9".into(), 1, bytes).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.peers.len().await, 0);
    }

    #[tokio::test]
    async fn master_fires_only_on_transition_into_master() {
        let ctx = context();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_cb = Arc::clone(&hits);
        ctx.callbacks.set_master(Arc::new(move |_p| { hits_cb.fetch_add(1, Ordering::SeqCst); }));

        // First hello: already master -> added (new) + master (is_master && was_new).
        handle_datagram(&ctx, "10.0.0.9".into(), 1, hello_bytes("rp", "ri", true, 2.0)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Second hello: still master, was already master -> no new fire.
        handle_datagram(&ctx, "10.0.0.9".into(), 1, hello_bytes("rp", "ri", true, 2.0)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
