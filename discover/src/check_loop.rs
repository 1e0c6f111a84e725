//! The check loop: ages out stale peers and re-runs the election rule
//! every `checkInterval`.

use std::sync::{Arc, Mutex as StdMutex};

use discover_types::Options;
use tokio::sync::watch;

use crate::callbacks::Callbacks;
use crate::election::{self, ElectionDecision};
use crate::peer_table::PeerTable;
use crate::state::InstanceState;

pub async fn run(
    peers: Arc<PeerTable>,
    options: Arc<StdMutex<Options>>,
    state: Arc<InstanceState>,
    callbacks: Arc<Callbacks>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let (node_timeout, master_timeout, masters_required, weight) = {
            let opts = options.lock().unwrap();
            (opts.node_timeout, opts.master_timeout, opts.masters_required, opts.weight)
        };

        let removed = peers.sweep(node_timeout, master_timeout).await;
        for peer in &removed {
            callbacks.fire_removed(peer);
        }

        let summary = peers.summary(weight).await;
        let decision = election::evaluate(
            state.is_master(),
            state.is_master_eligible(),
            masters_required,
            summary,
        );
        match decision {
            ElectionDecision::Demote => {
                state.set_master(false);
                callbacks.fire_demotion();
            }
            ElectionDecision::Promote => {
                state.set_master(true);
                callbacks.fire_promotion();
            }
            ElectionDecision::NoChange => {}
        }
        callbacks.fire_check();

        let check_interval = { options.lock().unwrap().check_interval };
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return;
                }
            }
            _ = tokio::time::sleep(check_interval) => {}
        }
    }
}
