//! Joinable group of sender threads.

use std::thread::{Builder, JoinHandle};
use tracing::warn;

/// Owns the round's outbound workers so they can all be awaited at the next
/// round boundary. Joining drains the group, leaving it ready for reuse.
#[derive(Debug, Default)]
pub struct ThreadGroup {
    handles: Vec<JoinHandle<()>>,
}

impl ThreadGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a named worker into the group.
    pub fn spawn(
        &mut self,
        name: String,
        f: impl FnOnce() + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let handle = Builder::new().name(name).spawn(f)?;
        self.handles.push(handle);
        Ok(())
    }

    /// Wait for every worker in the group and empty it.
    pub fn join_all(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("sender worker panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
