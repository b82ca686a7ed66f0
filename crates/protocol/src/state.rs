//! Per-round bookkeeping and the decision function.

use generals_types::{Order, ProcessId, RelayMessage};
use std::collections::{BTreeSet, HashSet};

/// Distinct relay paths a correct lieutenant hears in round `round` of an
/// `n`-process run: ordered paths of `round + 1` ids that start at the
/// commander and avoid both the receiver and repeats.
///
/// `M(n, 0) = 1` and `M(n, k) = (n - 1 - k) * M(n, k - 1)`.
pub fn expected_relays(processes: usize, round: u32) -> usize {
    (0..round as usize).fold(1, |acc, k| acc * (processes - 2 - k))
}

/// What one lieutenant knows, owned by its listen thread.
///
/// Everything here is per-round except `orders_seen`, which accumulates over
/// the whole run and feeds [`decision`](RoundState::decision). The paths and
/// relays collections stay in bijection: a relay is retained iff its path is
/// recorded, and recording preserves arrival order so next-round sends (and
/// logs) are deterministic.
#[derive(Debug)]
pub struct RoundState {
    round: u32,
    orders_seen: BTreeSet<Order>,
    relays: Vec<RelayMessage>,
    paths: HashSet<Vec<ProcessId>>,
}

impl RoundState {
    pub fn new() -> Self {
        Self {
            round: 0,
            orders_seen: BTreeSet::new(),
            relays: Vec::new(),
            paths: HashSet::new(),
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn orders_seen(&self) -> &BTreeSet<Order> {
        &self.orders_seen
    }

    /// Relays accepted so far this round, in arrival order.
    pub fn relays(&self) -> &[RelayMessage] {
        &self.relays
    }

    /// Record a validated relay. Returns false when it changes nothing: a
    /// path already recorded this round, or a second message in round 0,
    /// where only the commander's single proposal is admissible.
    pub fn record(&mut self, msg: RelayMessage) -> bool {
        if self.round == 0 && !self.orders_seen.is_empty() {
            return false;
        }
        if self.paths.contains(&msg.path) {
            return false;
        }
        self.paths.insert(msg.path.clone());
        self.orders_seen.insert(msg.order);
        self.relays.push(msg);
        true
    }

    /// Whether every expected path for this round has arrived.
    pub fn complete(&self, processes: usize) -> bool {
        self.paths.len() == expected_relays(processes, self.round)
    }

    /// Enter the next round, handing back the relays retained for
    /// forwarding. Orders seen survive; the per-round collections reset.
    pub fn advance(&mut self) -> Vec<RelayMessage> {
        self.round += 1;
        self.paths.clear();
        std::mem::take(&mut self.relays)
    }

    /// The final verdict: attack only on a unanimous run of attack orders.
    /// A retreat anywhere, or a run that heard nothing at all, retreats.
    pub fn decision(&self) -> Order {
        if self.orders_seen.len() == 1 && self.orders_seen.contains(&Order::Attack) {
            Order::Attack
        } else {
            Order::Retreat
        }
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}
