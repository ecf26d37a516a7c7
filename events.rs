/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Store change notifications.
//!
//! Every successful mutation of the canonical graph emits one event after
//! the in-memory state is updated. Delivery is fire-and-forget: a slow or
//! dropped subscriber never blocks or fails a merge.

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::graph::NodeKind;

/// A change to the canonical graph.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A page merge landed for the website at `url`.
    PageMerged { url: String },

    /// A node position was written (user drag or layout write-back).
    PositionChanged { kind: NodeKind, id: Uuid },

    /// The whole graph was cleared.
    GraphReset,
}

/// Fan-out of [`StoreEvent`]s to any number of subscribers.
///
/// Each subscriber gets its own unbounded channel so one stalled consumer
/// cannot starve the others. Disconnected subscribers are pruned on the
/// next emit.
#[derive(Default)]
pub(crate) struct EventHub {
    subscribers: Mutex<Vec<Sender<StoreEvent>>>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Events emitted before this call are not
    /// replayed.
    pub(crate) fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber.
    pub(crate) fn emit(&self, event: StoreEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
