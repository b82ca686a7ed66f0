//! Participant addresses and the roster shared by every process.

use crate::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing or resolving an [`Address`].
#[derive(Debug, Error)]
pub enum AddressError {
    #[error("`{0}` is not of the form host:port")]
    MissingPort(String),

    #[error("`{0}` has an invalid port")]
    InvalidPort(String),

    #[error("could not resolve `{addr}`: {source}")]
    Unresolvable {
        addr: Address,
        source: std::io::Error,
    },

    #[error("`{0}` resolved to no addresses")]
    NoAddresses(Address),
}

/// Where a participant receives datagrams.
///
/// The host half doubles as the participant's identity for message
/// validation: the last id on a relay path must map to the host the packet
/// actually came from. Ports are excluded from that comparison because
/// senders transmit from ephemeral ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Address {
            host: host.into(),
            port,
        }
    }

    /// Resolve to a socket address, taking the first result.
    pub fn resolve(&self) -> Result<SocketAddr, AddressError> {
        let mut addrs =
            (self.host.as_str(), self.port)
                .to_socket_addrs()
                .map_err(|source| AddressError::Unresolvable {
                    addr: self.clone(),
                    source,
                })?;
        addrs
            .next()
            .ok_or_else(|| AddressError::NoAddresses(self.clone()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressError::MissingPort(s.to_string()))?;
        let port = port
            .parse()
            .map_err(|_| AddressError::InvalidPort(s.to_string()))?;
        Ok(Address::new(host, port))
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::new(addr.ip().to_string(), addr.port())
    }
}

/// The participant table: one address per process, indexed by id, fixed at
/// startup and identical at every process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    participants: Vec<Address>,
}

impl Roster {
    pub fn new(participants: Vec<Address>) -> Self {
        Roster { participants }
    }

    /// Number of participants, commander included.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, id: ProcessId) -> Option<&Address> {
        self.participants.get(id.index())
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        id.index() < self.participants.len()
    }

    /// All process ids in order.
    pub fn ids(&self) -> impl Iterator<Item = ProcessId> {
        (0..self.participants.len() as u32).map(ProcessId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProcessId, &Address)> {
        self.participants
            .iter()
            .enumerate()
            .map(|(i, addr)| (ProcessId(i as u32), addr))
    }

    /// Whether this roster is large enough to tolerate `faults` Byzantine
    /// participants: oral messages requires n >= 3m + 1.
    pub fn supports_faults(&self, faults: u32) -> bool {
        self.len() >= 3 * faults as usize + 1
    }

    /// A copy of this roster with every host replaced by its resolved IP,
    /// so host comparison works for rosters written with hostnames.
    pub fn resolved(&self) -> Result<Roster, AddressError> {
        let participants = self
            .participants
            .iter()
            .map(|addr| {
                let resolved = addr.resolve()?;
                Ok(Address::new(resolved.ip().to_string(), addr.port))
            })
            .collect::<Result<Vec<_>, AddressError>>()?;
        Ok(Roster { participants })
    }
}
