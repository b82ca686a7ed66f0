//! The proposing side of a run.

use crate::config::ProtocolConfig;
use crate::error::ProtocolError;
use crate::workers::ThreadGroup;
use generals_network::{wire, DatagramClient};
use generals_types::{Order, ProcessId, RelayMessage, Roster};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Process 0: proposes an order to every lieutenant and is done.
///
/// The fan-out is parallel so a slow lieutenant cannot leave the others a
/// round behind; each send awaits a round-0 ack with bounded retry. A
/// lieutenant that never acks is simply left to its own round timeout.
#[derive(Debug)]
pub struct Commander<C> {
    order: Order,
    clients: BTreeMap<ProcessId, Arc<C>>,
    config: ProtocolConfig,
}

impl<C: DatagramClient + 'static> Commander<C> {
    /// Build the commander for `roster`, with one client per lieutenant.
    pub fn new(
        order: Order,
        roster: &Roster,
        clients: BTreeMap<ProcessId, Arc<C>>,
        config: ProtocolConfig,
    ) -> Result<Self, ProtocolError> {
        for id in roster.ids().filter(|id| !id.is_commander()) {
            if !clients.contains_key(&id) {
                return Err(ProtocolError::MissingClient(id));
            }
        }
        Ok(Self {
            order,
            clients,
            config,
        })
    }

    /// Send the proposal to all lieutenants in parallel and return it.
    pub fn decide(&self) -> Order {
        let msg = RelayMessage::initial(self.order);
        let payload = wire::encode_relay(&msg);
        let attempts = self.config.send_attempts;

        let mut senders = ThreadGroup::new();
        for (&id, client) in &self.clients {
            info!(to = %id, %msg, "sending proposal");
            let client = Arc::clone(client);
            let payload = payload.clone();
            let spawned = senders.spawn(format!("propose-to-{id}"), move || {
                let is_ack = |buf: &[u8]| matches!(wire::decode_ack(buf), Ok(0));
                if let Err(err) = client.send_with_ack(&payload, attempts, &is_ack) {
                    warn!(to = %client.remote_address(), %err, "proposal not acknowledged");
                }
            });
            if let Err(err) = spawned {
                warn!(to = %id, %err, "could not spawn proposal worker");
            }
        }
        senders.join_all();

        info!(order = %self.order, "proposal delivered");
        self.order
    }
}
