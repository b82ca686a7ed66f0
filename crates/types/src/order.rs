//! The order a run agrees on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two-valued command the commander proposes and every lieutenant decides.
///
/// On the wire an order travels as a 32-bit integer; `RETREAT` is 0 and
/// `ATTACK` is 1 at every participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Retreat,
    Attack,
}

impl Order {
    /// The integer transmitted in the relay frame.
    pub fn to_wire(self) -> u32 {
        match self {
            Order::Retreat => 0,
            Order::Attack => 1,
        }
    }

    /// Decode a wire integer. Anything but the two assigned values is
    /// malformed and rejected.
    pub fn from_wire(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Order::Retreat),
            1 => Some(Order::Attack),
            _ => None,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Retreat => write!(f, "retreat"),
            Order::Attack => write!(f, "attack"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_mapping() {
        assert_eq!(Order::Retreat.to_wire(), 0);
        assert_eq!(Order::Attack.to_wire(), 1);
        assert_eq!(Order::from_wire(0), Some(Order::Retreat));
        assert_eq!(Order::from_wire(1), Some(Order::Attack));
        assert_eq!(Order::from_wire(2), None);
        assert_eq!(Order::from_wire(u32::MAX), None);
    }
}
