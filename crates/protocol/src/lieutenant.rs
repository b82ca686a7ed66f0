//! The listening side of a run.

use crate::config::ProtocolConfig;
use crate::error::ProtocolError;
use crate::relay::plan_fanout;
use crate::state::RoundState;
use crate::validate::validate_relay;
use crate::workers::ThreadGroup;
use generals_network::{
    wire, DatagramClient, DatagramServer, DatagramSink, ServerAction, ServerHandler,
};
use generals_types::{Order, ProcessId, Roster};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// One of the `n - 1` processes awaiting the commander's order.
///
/// A lieutenant blocks in its server's listen loop; both callbacks run on
/// that one thread, which therefore owns all round state. Rounds advance
/// when every expected path has arrived, when the idle timeout fires, or
/// when the round's wall-clock deadline passes; after round `m` the loop
/// stops and the decision function is evaluated over every order seen.
#[derive(Debug)]
pub struct Lieutenant<C> {
    id: ProcessId,
    roster: Roster,
    faults: u32,
    config: ProtocolConfig,
    clients: BTreeMap<ProcessId, Arc<C>>,
    state: RoundState,
    round_started: Instant,
    senders: ThreadGroup,
}

impl<C: DatagramClient + 'static> Lieutenant<C> {
    /// Build lieutenant `id`, with one client per process it may relay to
    /// (everyone but itself and the commander).
    pub fn new(
        id: ProcessId,
        roster: Roster,
        faults: u32,
        clients: BTreeMap<ProcessId, Arc<C>>,
        config: ProtocolConfig,
    ) -> Result<Self, ProtocolError> {
        if !roster.supports_faults(faults) {
            return Err(ProtocolError::RosterTooSmall {
                processes: roster.len(),
                faults,
            });
        }
        if !roster.contains(id) {
            return Err(ProtocolError::UnknownProcess(id));
        }
        if id.is_commander() {
            return Err(ProtocolError::WrongRole(id));
        }
        for peer in roster.ids() {
            if peer != id && !peer.is_commander() && !clients.contains_key(&peer) {
                return Err(ProtocolError::MissingClient(peer));
            }
        }

        Ok(Self {
            id,
            roster,
            faults,
            config,
            clients,
            state: RoundState::new(),
            round_started: Instant::now(),
            senders: ThreadGroup::new(),
        })
    }

    /// Run the listen loop to completion and decide.
    ///
    /// Never fails: a broken transport is logged and the decision falls back
    /// to whatever was heard, which with nothing heard is retreat.
    pub fn decide<S: DatagramServer>(&mut self, server: &mut S) -> Order {
        info!(id = %self.id, faults = self.faults, "awaiting orders");
        self.round_started = Instant::now();
        if let Err(err) = server.listen(self) {
            error!(id = %self.id, %err, "listen loop failed");
        }
        self.senders.join_all();

        let decision = self.state.decision();
        info!(id = %self.id, %decision, "decided");
        decision
    }

    /// Round and order bookkeeping, for inspection in tests.
    pub fn state(&self) -> &RoundState {
        &self.state
    }

    fn last_round(&self) -> bool {
        self.state.round() >= self.faults
    }

    /// Either end the run or enter the next round.
    fn advance_or_stop(&mut self) -> ServerAction {
        if self.last_round() {
            self.senders.join_all();
            ServerAction::Stop
        } else {
            self.start_next_round();
            ServerAction::Continue
        }
    }

    /// Round entry: await the previous round's workers, append ourselves to
    /// every retained relay, and fan the results out with one worker per
    /// destination. Messages to the same destination go serially, in the
    /// order they were retained.
    fn start_next_round(&mut self) {
        self.senders.join_all();

        let retained = self.state.advance();
        let round = self.state.round();
        debug!(id = %self.id, round, relaying = retained.len(), "entering round");

        for (dest, batch) in plan_fanout(retained, self.id, self.roster.len(), round) {
            let Some(client) = self.clients.get(&dest) else {
                // Constructor guarantees clients for every possible
                // destination; an absent one means the roster changed.
                warn!(id = %self.id, %dest, "no client for destination");
                continue;
            };
            for msg in &batch {
                debug!(id = %self.id, to = %dest, %msg, "relaying");
            }

            let frames: Vec<(u32, Vec<u8>)> = batch
                .iter()
                .map(|msg| (msg.round, wire::encode_relay(msg)))
                .collect();
            let client = Arc::clone(client);
            let attempts = self.config.send_attempts;
            let spawned = self.senders.spawn(format!("relay-to-{dest}"), move || {
                for (round, payload) in frames {
                    let is_ack = |buf: &[u8]| matches!(wire::decode_ack(buf), Ok(r) if r == round);
                    if let Err(err) = client.send_with_ack(&payload, attempts, &is_ack) {
                        debug!(to = %client.remote_address(), %err, "relay not acknowledged");
                    }
                }
            });
            if let Err(err) = spawned {
                warn!(to = %dest, %err, "could not spawn relay worker");
            }
        }

        self.round_started = Instant::now();
    }

    /// The message-driven continuation: keep listening unless this round has
    /// been running past its wall-clock budget, in which case it is treated
    /// exactly like an idle timeout. Round 0 has no budget.
    fn continue_unless_deadline(&mut self) -> ServerAction {
        if self.state.round() > 0 && self.round_started.elapsed() >= self.config.round_deadline {
            debug!(id = %self.id, round = self.state.round(), "round deadline exceeded");
            return self.advance_or_stop();
        }
        ServerAction::Continue
    }
}

impl<C: DatagramClient + 'static> ServerHandler for Lieutenant<C> {
    fn on_datagram(&mut self, peer: &dyn DatagramSink, payload: &[u8]) -> ServerAction {
        let msg = match wire::decode_relay(payload) {
            Ok(msg) => msg,
            Err(err) => {
                trace!(from = %peer.remote_address(), %err, "dropping undecodable datagram");
                return self.continue_unless_deadline();
            }
        };
        if let Err(rejection) = validate_relay(
            &msg,
            peer.remote_address(),
            self.id,
            &self.roster,
            self.state.round(),
        ) {
            trace!(from = %peer.remote_address(), %rejection, "dropping relay");
            return self.continue_unless_deadline();
        }

        debug!(id = %self.id, from = %peer.remote_address(), %msg, "received relay");

        // Ack even when the path turns out to be a duplicate: the sender may
        // have missed the previous ack and retransmitted.
        if let Err(err) = peer.send(&wire::encode_ack(self.state.round())) {
            debug!(to = %peer.remote_address(), %err, "failed to send ack");
        }

        if self.state.record(msg) && self.state.complete(self.roster.len()) {
            return self.advance_or_stop();
        }
        self.continue_unless_deadline()
    }

    fn on_idle(&mut self) -> ServerAction {
        // Round 0 cannot time out; nothing moves without the commander.
        if self.state.round() == 0 {
            return ServerAction::Continue;
        }
        debug!(id = %self.id, round = self.state.round(), "round timed out");
        self.advance_or_stop()
    }
}
