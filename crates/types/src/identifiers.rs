//! Process identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one participant in the run.
///
/// Ids are dense indexes into the [`Roster`](crate::Roster): the commander is
/// always id 0 and lieutenants are 1..n-1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

/// The process that proposes the order. Every relay path starts here.
pub const COMMANDER: ProcessId = ProcessId(0);

impl ProcessId {
    /// Index into roster-ordered collections.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_commander(self) -> bool {
        self == COMMANDER
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(raw: u32) -> Self {
        ProcessId(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ProcessId(3).to_string(), "p3");
        assert_eq!(COMMANDER.to_string(), "p0");
    }

    #[test]
    fn test_commander_is_zero() {
        assert!(ProcessId(0).is_commander());
        assert!(!ProcessId(1).is_commander());
    }
}
