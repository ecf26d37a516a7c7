/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Persistence round-trips through both storage backends, receipt
//! semantics, and the change-event feed.

use std::sync::Arc;

use euclid::default::Point2D;
use serde_json::json;
use sitegraph::{
    FileStorage, GraphStore, MemoryStorage, NodeKind, StorageBackend, StoreEvent,
};
use tempfile::TempDir;

use crate::harness::{open_store, page};

const GRAPH_DATA_KEY: &str = "graphData";

#[test]
fn graph_survives_reopen_over_memory_storage() {
    let storage = Arc::new(MemoryStorage::new());
    {
        let store = GraphStore::open(storage.clone());
        store
            .merge_page_data(&page("https://a.com", "A", &["rust"]))
            .unwrap()
            .receipt
            .wait()
            .unwrap();
    }

    let reopened = GraphStore::open(storage);
    let snapshot = reopened.snapshot();
    assert_eq!(snapshot.websites.len(), 1);
    assert_eq!(snapshot.keywords.len(), 1);
    assert_eq!(snapshot.website_to_keyword_edges.len(), 1);
}

#[test]
fn graph_survives_process_restart_over_file_storage() {
    let dir = TempDir::new().unwrap();
    let website_id = {
        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
        let store = GraphStore::open(storage);
        let outcome = store
            .merge_page_data(&page("https://a.com", "A", &["rust", "graphs"]))
            .unwrap();
        outcome.receipt.wait().unwrap();
        outcome.website
    };

    // Fresh backend over the same directory, as after a restart.
    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let reopened = GraphStore::open(storage);
    let snapshot = reopened.snapshot();
    assert_eq!(snapshot.websites[0].id, website_id);
    assert_eq!(snapshot.keywords.len(), 2);
}

#[test]
fn positions_survive_restart() {
    let dir = TempDir::new().unwrap();
    let keyword_id = {
        let store = GraphStore::open(Arc::new(FileStorage::open(dir.path()).unwrap()));
        store
            .merge_page_data(&page("https://a.com", "A", &["rust"]))
            .unwrap();
        let keyword_id = store.snapshot().keywords[0].id;
        store
            .update_position(NodeKind::Keyword, keyword_id, Point2D::new(7.0, 8.0))
            .unwrap()
            .wait()
            .unwrap();
        keyword_id
    };

    let reopened = GraphStore::open(Arc::new(FileStorage::open(dir.path()).unwrap()));
    let snapshot = reopened.snapshot();
    assert_eq!(snapshot.keywords[0].id, keyword_id);
    let position = snapshot.keywords[0].position.unwrap();
    assert_eq!((position.x, position.y), (7.0, 8.0));
}

#[test]
fn corrupt_persisted_blob_starts_empty_and_recovers_on_next_write() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set(std::collections::HashMap::from([(
            GRAPH_DATA_KEY.to_string(),
            json!([1, 2, 3]),
        )]))
        .unwrap();

    let store = GraphStore::open(storage.clone());
    assert!(store.snapshot().is_empty());

    store
        .merge_page_data(&page("https://a.com", "A", &[]))
        .unwrap()
        .receipt
        .wait()
        .unwrap();

    let reopened = GraphStore::open(storage);
    assert_eq!(reopened.snapshot().websites.len(), 1);
}

#[test]
fn dropping_the_receipt_is_fire_and_forget() {
    let (store, storage) = open_store();

    // Receipt dropped immediately; the write still lands.
    store
        .merge_page_data(&page("https://a.com", "A", &[]))
        .unwrap();
    drop(store); // join the writer

    assert_eq!(storage.len(), 1);
}

#[test]
fn storage_change_feed_reports_graph_writes() {
    let (store, storage) = open_store();
    let changes = storage.subscribe();

    store
        .merge_page_data(&page("https://a.com", "A", &[]))
        .unwrap()
        .receipt
        .wait()
        .unwrap();

    assert_eq!(changes.try_recv().unwrap().key, GRAPH_DATA_KEY);
}

#[test]
fn store_events_track_the_mutation_sequence() {
    let (store, _storage) = open_store();
    let events = store.subscribe();

    store
        .merge_page_data(&page("https://a.com", "A", &[]))
        .unwrap();
    store.reset();

    assert_eq!(
        events.try_recv(),
        Ok(StoreEvent::PageMerged {
            url: "https://a.com".to_string()
        })
    );
    assert_eq!(events.try_recv(), Ok(StoreEvent::GraphReset));
}
