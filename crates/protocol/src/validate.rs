//! The acceptance predicate for incoming relays.

use generals_types::{Address, ProcessId, RelayMessage, Roster, COMMANDER};
use std::collections::HashSet;
use thiserror::Error;

/// Why a relay was refused. Refused relays are dropped silently: no ack, no
/// state change. Under the Byzantine fault model these are routine, so they
/// surface as trace-level logs rather than errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayRejection {
    #[error("relay for round {got} in round {current}")]
    WrongRound { got: u32, current: u32 },

    #[error("path of {len} ids in round {round}")]
    PathLength { len: usize, round: u32 },

    #[error("path does not start at the commander")]
    NotFromCommander,

    #[error("path contains unknown id {0}")]
    UnknownProcess(ProcessId),

    #[error("path contains our own id")]
    OwnId,

    #[error("path repeats {0}")]
    DuplicateId(ProcessId),

    #[error("sent from {got}, but {claimed} lives at host {want}")]
    SenderMismatch {
        claimed: ProcessId,
        want: String,
        got: String,
    },
}

/// Accept or refuse a relay received while in `current_round`.
///
/// A relay passes iff it belongs to the current round, its path has exactly
/// `round + 1` distinct known ids starting at the commander and excluding
/// `own_id`, and the packet's source host matches the roster entry of the
/// path's last id. Ports are deliberately not compared: senders use
/// ephemeral ports, which also means processes sharing one host cannot be
/// told apart here.
pub fn validate_relay(
    msg: &RelayMessage,
    from: &Address,
    own_id: ProcessId,
    roster: &Roster,
    current_round: u32,
) -> Result<(), RelayRejection> {
    if msg.round != current_round {
        return Err(RelayRejection::WrongRound {
            got: msg.round,
            current: current_round,
        });
    }
    if msg.path.len() != msg.round as usize + 1 {
        return Err(RelayRejection::PathLength {
            len: msg.path.len(),
            round: msg.round,
        });
    }
    if msg.path[0] != COMMANDER {
        return Err(RelayRejection::NotFromCommander);
    }

    let mut seen = HashSet::with_capacity(msg.path.len());
    for &id in &msg.path {
        if !roster.contains(id) {
            return Err(RelayRejection::UnknownProcess(id));
        }
        if id == own_id {
            return Err(RelayRejection::OwnId);
        }
        if !seen.insert(id) {
            return Err(RelayRejection::DuplicateId(id));
        }
    }

    // The path is non-empty here: its length is round + 1 >= 1.
    let claimed = msg.path[msg.path.len() - 1];
    let want = &roster
        .get(claimed)
        .ok_or(RelayRejection::UnknownProcess(claimed))?
        .host;
    if *want != from.host {
        return Err(RelayRejection::SenderMismatch {
            claimed,
            want: want.clone(),
            got: from.host.clone(),
        });
    }

    Ok(())
}
