//! Fan-out planning at round entry.

use generals_types::{ProcessId, RelayMessage};
use std::collections::BTreeMap;

/// Relays addressed to one destination, sent serially by one worker so they
/// arrive in path order.
pub type FanOut = BTreeMap<ProcessId, Vec<RelayMessage>>;

/// Rewrite the relays retained from round `next_round - 1` for forwarding by
/// `relayer` and group them by destination.
///
/// Each retained message gains the relayer at the end of its path and moves
/// to `next_round`; it is then owed to every process not already on that
/// path (which excludes the relayer itself and always excludes the
/// commander). Destinations are keyed in id order and each destination's
/// batch preserves the retained order.
///
/// Panics if a retained message is not from the round just ended; that is a
/// bookkeeping bug, not a fault-model event.
pub fn plan_fanout(
    retained: Vec<RelayMessage>,
    relayer: ProcessId,
    processes: usize,
    next_round: u32,
) -> FanOut {
    let mut batches = FanOut::new();
    for msg in retained {
        assert_eq!(
            msg.round + 1,
            next_round,
            "retained relay from round {} at entry to round {}",
            msg.round,
            next_round,
        );
        let msg = msg.forwarded(relayer);
        for id in (0..processes as u32).map(ProcessId) {
            if !msg.visited(id) {
                batches.entry(id).or_default().push(msg.clone());
            }
        }
    }
    batches
}
