/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The key-value storage boundary.
//!
//! The host environment owns durable storage; this crate talks to it through
//! [`StorageBackend`]: opaque string keys, JSON values, and a changed-key
//! notification feed. Two implementations ship with the crate:
//! - [`MemoryStorage`] — in-process map, the test double and reference
//!   implementation of the change feed
//! - [`FileStorage`] — one JSON document on disk, written atomically

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crossbeam_channel::Receiver;
use serde_json::Value;
use std::collections::HashMap;

/// Storage-layer failure. Transient by policy: callers log and keep the
/// in-memory state authoritative until a later write succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    Io(String),
    Serde(String),
    Closed,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "IO error: {e}"),
            StorageError::Serde(e) => write!(f, "Serialization error: {e}"),
            StorageError::Closed => write!(f, "Storage backend is closed"),
        }
    }
}

impl std::error::Error for StorageError {}

/// A changed-key notification, mirroring the host's `onChanged` callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
}

/// Host-provided key-value store: opaque string keys, JSON-serializable
/// values, change notification. All methods are synchronous; callers that
/// must not block (the graph store's merge path) push writes onto their own
/// writer thread.
pub trait StorageBackend: Send + Sync {
    /// Fetch the listed keys. Missing keys are simply absent from the map.
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError>;

    /// Write every entry. Observable atomicity per key only.
    fn set(&self, entries: HashMap<String, Value>) -> Result<(), StorageError>;

    /// Delete one key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Subscribe to changed-key notifications for `set` and `remove`.
    fn subscribe(&self) -> Receiver<StorageChange>;
}
