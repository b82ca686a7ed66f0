//! The protocol-level relay message.

use crate::{Order, ProcessId, COMMANDER};
use std::fmt;

/// An order together with the path of processes that relayed it.
///
/// A message with `round = k` has been carried through `k + 1` processes,
/// so a well-formed path always has `round + 1` entries, starts at the
/// commander and never repeats an id. The path is what authenticates
/// provenance in the oral-messages model: there are no signatures, only the
/// claim of who has already spoken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    /// 0-based relay round this message belongs to.
    pub round: u32,
    /// The order being relayed.
    pub order: Order,
    /// Ids of the processes the order has passed through, commander first.
    /// The last entry is the immediate sender.
    pub path: Vec<ProcessId>,
}

impl RelayMessage {
    /// The commander's round-0 proposal.
    pub fn initial(order: Order) -> Self {
        RelayMessage {
            round: 0,
            order,
            path: vec![COMMANDER],
        }
    }

    /// The immediate sender, i.e. the last process on the path.
    pub fn sender(&self) -> Option<ProcessId> {
        self.path.last().copied()
    }

    /// Whether `id` has already relayed (or originated) this message.
    /// Such processes must not receive it again.
    pub fn visited(&self, id: ProcessId) -> bool {
        self.path.contains(&id)
    }

    /// The message as forwarded by `relayer` in the next round: the round
    /// advances by one and the relayer joins the end of the path.
    pub fn forwarded(&self, relayer: ProcessId) -> Self {
        let mut path = self.path.clone();
        path.push(relayer);
        RelayMessage {
            round: self.round + 1,
            order: self.order,
            path,
        }
    }
}

impl fmt::Display for RelayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in round {} via [", self.order, self.round)?;
        for (i, id) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", id.0)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_shape() {
        let msg = RelayMessage::initial(Order::Attack);
        assert_eq!(msg.round, 0);
        assert_eq!(msg.path, vec![COMMANDER]);
        assert_eq!(msg.sender(), Some(COMMANDER));
    }

    #[test]
    fn test_forwarded_extends_path_and_round() {
        let msg = RelayMessage::initial(Order::Retreat).forwarded(ProcessId(2));
        assert_eq!(msg.round, 1);
        assert_eq!(msg.path, vec![ProcessId(0), ProcessId(2)]);
        assert_eq!(msg.sender(), Some(ProcessId(2)));
        assert_eq!(msg.order, Order::Retreat);
    }

    #[test]
    fn test_visited() {
        let msg = RelayMessage::initial(Order::Attack).forwarded(ProcessId(3));
        assert!(msg.visited(ProcessId(0)));
        assert!(msg.visited(ProcessId(3)));
        assert!(!msg.visited(ProcessId(1)));
    }

    #[test]
    fn test_display() {
        let msg = RelayMessage::initial(Order::Attack).forwarded(ProcessId(3));
        assert_eq!(msg.to_string(), "attack in round 1 via [0 3]");
    }
}
