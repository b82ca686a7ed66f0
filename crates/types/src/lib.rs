//! Core types for oral-messages Byzantine agreement.
//!
//! This crate provides the foundational types used throughout the
//! implementation:
//!
//! - **Identifiers**: [`ProcessId`], with the commander fixed at id 0
//! - **Orders**: the two-valued [`Order`] a run decides on
//! - **Messages**: [`RelayMessage`], an order plus the path of processes
//!   that relayed it
//! - **Topology**: [`Address`] and the [`Roster`] of all participants
//!
//! # Design Philosophy
//!
//! This crate is self-contained and does not depend on any other workspace
//! crates, making it the foundation layer. Nothing here touches the network;
//! the wire representation of these types lives in `generals-network`.

mod identifiers;
mod message;
mod order;
mod roster;

pub use identifiers::{ProcessId, COMMANDER};
pub use message::RelayMessage;
pub use order::Order;
pub use roster::{Address, AddressError, Roster};
