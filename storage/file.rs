/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! File-backed storage: the whole key space as one JSON document.
//!
//! Writes go through a temp file in the same directory followed by a rename,
//! so a crash mid-write leaves the previous document intact. The key space
//! here is a handful of small blobs (the graph, preferences), so one
//! document is cheaper than a real database.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::warn;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{StorageBackend, StorageChange, StorageError};

const STORAGE_FILE: &str = "storage.json";

/// [`StorageBackend`] persisting to a single JSON file.
pub struct FileStorage {
    path: PathBuf,
    /// Guards the read-modify-write of the document; the file itself is
    /// replaced atomically via rename.
    document: Mutex<HashMap<String, Value>>,
    subscribers: Mutex<Vec<Sender<StorageChange>>>,
}

impl FileStorage {
    /// Open or create the store under `dir`. An unreadable or undecodable
    /// existing document is logged and treated as empty; the next write
    /// replaces it.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)
            .map_err(|e| StorageError::Io(format!("Failed to create dir: {e}")))?;
        let path = dir.join(STORAGE_FILE);
        let document = Self::load_document(&path);
        Ok(Self {
            path,
            document: Mutex::new(document),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Platform config dir for the default store location.
    pub fn default_data_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sitegraph")
    }

    fn load_document(path: &Path) -> HashMap<String, Value> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!("Failed to read storage document, starting empty: {e}");
                return HashMap::new();
            },
        };
        match serde_json::from_slice(&bytes) {
            Ok(document) => document,
            Err(e) => {
                warn!("Storage document is not valid JSON, starting empty: {e}");
                HashMap::new()
            },
        }
    }

    /// Serialize the full document to a sibling temp file, then rename over
    /// the real path. Called with the document lock held.
    fn write_document(&self, document: &HashMap<String, Value>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(document).map_err(|e| StorageError::Serde(format!("{e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)
            .map_err(|e| StorageError::Io(format!("Failed to write temp file: {e}")))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| StorageError::Io(format!("Failed to replace document: {e}")))
    }

    fn notify(&self, keys: &[String]) {
        let mut subscribers = self.subscribers.lock();
        for key in keys {
            subscribers.retain(|tx| {
                tx.send(StorageChange { key: key.clone() }).is_ok()
            });
        }
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        let document = self.document.lock();
        Ok(keys
            .iter()
            .filter_map(|&key| document.get(key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, entries: HashMap<String, Value>) -> Result<(), StorageError> {
        let changed: Vec<String> = {
            let mut document = self.document.lock();
            let keys: Vec<String> = entries.keys().cloned().collect();
            document.extend(entries);
            self.write_document(&document)?;
            keys
        };
        self.notify(&changed);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let existed = {
            let mut document = self.document.lock();
            let existed = document.remove(key).is_some();
            if existed {
                self.write_document(&document)?;
            }
            existed
        };
        if existed {
            self.notify(&[key.to_string()]);
        }
        Ok(())
    }

    fn subscribe(&self) -> Receiver<StorageChange> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }
}
