//! Recursive oral-messages Byzantine agreement.
//!
//! The commander proposes an [`Order`](generals_types::Order) to `n - 1`
//! lieutenants; the protocol runs `m + 1` rounds of relays so that up to `m`
//! Byzantine participants among `n >= 3m + 1` cannot split the decision of
//! the correct ones.
//!
//! # Structure
//!
//! - [`validate`]: the acceptance predicate over incoming relays
//! - [`state`]: per-round bookkeeping and the decision function
//! - [`relay`]: fan-out planning for round entry
//! - [`workers`]: the per-destination sender thread group
//! - [`Commander`] / [`Lieutenant`]: the two role controllers
//!
//! # Concurrency Model
//!
//! One thread owns all mutable protocol state: the lieutenant's listen loop
//! runs both callbacks on the thread that called [`Lieutenant::decide`].
//! Outbound relays fan out to short-lived workers,
//! one per destination per round, which only perform I/O on an immutable
//! snapshot of their batch. Round advancement joins the previous round's
//! workers first, so no stale relay is in flight when the next round's are
//! generated.

mod commander;
mod config;
mod error;
mod lieutenant;
pub mod relay;
pub mod state;
#[cfg(test)]
mod testing;
pub mod validate;
pub mod workers;

pub use commander::Commander;
pub use config::ProtocolConfig;
pub use error::ProtocolError;
pub use lieutenant::Lieutenant;
