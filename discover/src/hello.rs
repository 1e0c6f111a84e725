//! The hello loop: broadcasts this instance's state every
//! `helloInterval`. Never spawned when `client` is set.

use std::sync::{Arc, Mutex as StdMutex};

use discover_transport::Transport;
use discover_types::{Envelope, HelloData, Options};
use tokio::sync::watch;

use crate::callbacks::Callbacks;
use crate::channels::HELLO_EVENT;
use crate::state::InstanceState;

pub async fn run(
    transport: Arc<dyn Transport>,
    options: Arc<StdMutex<Options>>,
    state: Arc<InstanceState>,
    callbacks: Arc<Callbacks>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let (address, hostname, weight, advertisement) = {
            let opts = options.lock().unwrap();
            (opts.address.clone(), opts.hostname.clone(), opts.weight, opts.advertisement.clone())
        };

        let hello_data = HelloData {
            is_master: state.is_master(),
            is_master_eligible: state.is_master_eligible(),
            weight,
            address,
            advertisement,
        };

        if let Ok(data) = serde_json::to_value(&hello_data) {
            let envelope = Envelope {
                event: HELLO_EVENT.to_string(),
                pid: state.process_id.clone(),
                iid: state.instance_id.clone(),
                host_name: hostname,
                data,
            };
            if let Ok(bytes) = serde_json::to_vec(&envelope) {
                transport.send(&bytes).await;
                callbacks.fire_hello_emitted(&hello_data);
            }
        }

        let interval = { options.lock().unwrap().hello_interval };
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
