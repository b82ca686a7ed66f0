//! Scripted transport doubles for unit tests.

use generals_network::{DatagramClient, DatagramSink, TransportError};
use generals_types::Address;
use std::sync::Mutex;

/// Records every payload; acknowledges every `send_with_ack` immediately.
#[derive(Debug)]
pub struct MockClient {
    remote: Address,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MockClient {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            remote: Address::new(host, 9000),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

impl DatagramSink for MockClient {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    fn remote_address(&self) -> &Address {
        &self.remote
    }
}

impl DatagramClient for MockClient {
    fn send_with_ack(
        &self,
        payload: &[u8],
        _max_attempts: u32,
        _is_ack: &dyn Fn(&[u8]) -> bool,
    ) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

/// Stands in for the reply handle a server hands its callbacks.
pub struct MockSink {
    remote: Address,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MockSink {
    /// A sink whose packets appear to come from `host` (on an ephemeral
    /// port, like real received datagrams).
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            remote: Address::new(host, 54321),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

impl DatagramSink for MockSink {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    fn remote_address(&self) -> &Address {
        &self.remote
    }
}
