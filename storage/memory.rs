/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! In-memory storage backend.

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;

use super::{StorageBackend, StorageChange, StorageError};

/// Map-backed [`StorageBackend`]. Never fails; used as the test double and
/// for hosts that handle durability themselves.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Value>>,
    subscribers: Mutex<Vec<Sender<StorageChange>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys. Test convenience.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn notify(&self, key: &str) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| {
            tx.send(StorageChange {
                key: key.to_string(),
            })
            .is_ok()
        });
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        let entries = self.entries.read();
        Ok(keys
            .iter()
            .filter_map(|&key| entries.get(key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, new_entries: HashMap<String, Value>) -> Result<(), StorageError> {
        let changed: Vec<String> = {
            let mut entries = self.entries.write();
            new_entries
                .into_iter()
                .map(|(key, value)| {
                    entries.insert(key.clone(), value);
                    key
                })
                .collect()
        };
        for key in &changed {
            self.notify(key);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let existed = self.entries.write().remove(key).is_some();
        if existed {
            self.notify(key);
        }
        Ok(())
    }

    fn subscribe(&self) -> Receiver<StorageChange> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }
}
