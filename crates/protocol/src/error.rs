//! Controller construction errors.

use generals_types::ProcessId;
use thiserror::Error;

/// Rejected controller configurations.
///
/// Once a controller is built, the run itself cannot fail: `decide()` always
/// returns an order, absorbing peer faults by round timeout.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("a roster of {processes} processes cannot tolerate {faults} faults")]
    RosterTooSmall { processes: usize, faults: u32 },

    #[error("{0} is not in the participant table")]
    UnknownProcess(ProcessId),

    #[error("no client for {0}")]
    MissingClient(ProcessId),

    #[error("{0} cannot take this role")]
    WrongRole(ProcessId),
}
