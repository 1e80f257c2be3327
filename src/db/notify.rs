// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process "store changed" broadcast for the local backend.

use tokio::sync::broadcast;

/// Name of the payload-less change event.
pub const LOCAL_STORE_UPDATED: &str = "local-storage-updated";

const CHANNEL_CAPACITY: usize = 16;

/// Fire-and-forget change signal. Clones share one channel.
#[derive(Clone)]
pub struct ChangeNotifier {
    name: &'static str,
    tx: broadcast::Sender<()>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(LOCAL_STORE_UPDATED)
    }
}

impl ChangeNotifier {
    pub fn new(name: &'static str) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { name, tx }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Announce a change. Having no listeners is fine.
    pub fn notify(&self) {
        let listeners = self.tx.send(()).unwrap_or(0);
        tracing::debug!(event = self.name, listeners, "Broadcast store change");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}
