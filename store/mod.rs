/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The canonical graph store.
//!
//! [`GraphStore`] is the single writer for the signal graph. Every mutation
//! is a read-modify-write of the whole in-memory graph under one mutex, so
//! merges for different pages can never interleave and the identity
//! invariants (one website per url, one keyword per normalized text) hold by
//! construction.
//!
//! Persistence is asynchronous: mutations queue the new `GraphData` blob to
//! a background writer thread and return immediately. Each queued write
//! hands back a [`PersistReceipt`]; dropping it is the fire-and-forget mode,
//! waiting on it surfaces the typed result. A failed write is warn-logged
//! and the in-memory graph stays authoritative until a later write lands.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use euclid::default::Point2D;
use log::warn;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::events::{EventHub, StoreEvent};
use crate::extract::{ExtractedPageData, PageDataError, normalize_text};
use crate::graph::data::GRAPH_DATA_KEY;
use crate::graph::{
    EdgeKind, GraphData, NodeKind, PersistedKeyword, PersistedMention, PersistedWebsite,
    SignalGraph,
};
use crate::storage::{StorageBackend, StorageError};

/// Result of a successful merge: the stable website id plus the receipt for
/// the persistence write it queued.
pub struct MergeOutcome {
    pub website: Uuid,
    pub receipt: PersistReceipt,
}

/// Handle to one queued persistence write.
///
/// Dropping the receipt ignores the outcome (the writer logs failures
/// either way); `wait` blocks for the typed result.
pub struct PersistReceipt {
    rx: Receiver<Result<(), StorageError>>,
}

impl PersistReceipt {
    /// Block until the write completes. A writer that shut down before
    /// handling the job reports [`StorageError::Closed`].
    pub fn wait(self) -> Result<(), StorageError> {
        self.rx.recv().unwrap_or(Err(StorageError::Closed))
    }

    /// Non-blocking poll; `None` while the write is still queued.
    pub fn try_result(&self) -> Option<Result<(), StorageError>> {
        self.rx.try_recv().ok()
    }

    fn already_failed(error: StorageError) -> Self {
        let (tx, rx) = bounded(1);
        let _ = tx.send(Err(error));
        Self { rx }
    }
}

/// Detached search result rows. Owned clones — the store lock is released
/// before these are handed to the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub websites: Vec<PersistedWebsite>,
    pub keywords: Vec<PersistedKeyword>,
    pub mentions: Vec<PersistedMention>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.websites.is_empty() && self.keywords.is_empty() && self.mentions.is_empty()
    }
}

struct WriteJob {
    data: GraphData,
    receipt: Sender<Result<(), StorageError>>,
}

/// Canonical owner of the signal graph.
pub struct GraphStore {
    graph: Mutex<SignalGraph>,
    events: EventHub,
    jobs: Option<Sender<WriteJob>>,
    writer: Option<JoinHandle<()>>,
}

impl GraphStore {
    /// Open a store over `storage`, hydrating from the persisted `graphData`
    /// key. A missing blob starts empty; an unreadable or undecodable blob
    /// is warn-logged and also starts empty (the next successful write
    /// replaces it).
    pub fn open(storage: Arc<dyn StorageBackend>) -> Self {
        let graph = match storage.get(&[GRAPH_DATA_KEY]) {
            Ok(mut values) => match values.remove(GRAPH_DATA_KEY) {
                Some(value) => match serde_json::from_value::<GraphData>(value) {
                    Ok(data) => SignalGraph::from_graph_data(&data),
                    Err(e) => {
                        warn!("Persisted graph blob is undecodable, starting empty: {e}");
                        SignalGraph::new()
                    },
                },
                None => SignalGraph::new(),
            },
            Err(e) => {
                warn!("Failed to read persisted graph, starting empty: {e}");
                SignalGraph::new()
            },
        };

        let (jobs_tx, jobs_rx) = unbounded::<WriteJob>();
        let writer = std::thread::Builder::new()
            .name("sitegraph-persist".to_string())
            .spawn(move || run_writer(storage, jobs_rx))
            .ok();
        if writer.is_none() {
            warn!("Failed to spawn persistence writer; writes will be dropped");
        }

        Self {
            graph: Mutex::new(graph),
            events: EventHub::new(),
            jobs: writer.is_some().then_some(jobs_tx),
            writer,
        }
    }

    /// Fold one page's extracted signals into the graph.
    ///
    /// One atomic step: website upsert by url, keyword lookup-or-create by
    /// normalized text (global), mention lookup-or-create by (normalized
    /// text, website), and wholesale replacement of the website's outgoing
    /// edge sets, all under one lock acquisition. A malformed record is
    /// rejected up front and the graph is left untouched.
    pub fn merge_page_data(
        &self,
        data: &ExtractedPageData,
    ) -> Result<MergeOutcome, PageDataError> {
        if let Err(e) = data.validate() {
            warn!("Skipping malformed extraction record: {e}");
            return Err(e);
        }

        let url = data.url.trim().to_string();
        let (website_id, persisted) = {
            let mut graph = self.graph.lock();

            let website_key = graph.upsert_website(
                &url,
                data.title.trim(),
                data.favicon.as_deref(),
                now_unix_ms(),
            );
            let website_id = graph
                .get(website_key)
                .map(|w| w.id())
                .unwrap_or_else(Uuid::nil);

            let keyword_keys: Vec<_> = data
                .normalized_keywords()
                .iter()
                .map(|text| graph.lookup_or_create_keyword(text, website_id))
                .collect();
            graph.replace_website_edges(website_key, EdgeKind::WebsiteKeyword, &keyword_keys);

            let mention_keys: Vec<_> = data
                .deduplicated_mentions()
                .iter()
                .map(|mention| {
                    graph.lookup_or_create_mention(
                        mention.text.trim(),
                        &normalize_text(&mention.text),
                        &mention.context,
                        website_id,
                    )
                })
                .collect();
            graph.replace_website_edges(website_key, EdgeKind::WebsiteMention, &mention_keys);

            (website_id, graph.to_graph_data())
        };

        let receipt = self.queue_persist(persisted);
        self.events.emit(StoreEvent::PageMerged { url });

        Ok(MergeOutcome {
            website: website_id,
            receipt,
        })
    }

    /// Clear the whole graph and persist the empty state. Idempotent.
    pub fn reset(&self) -> PersistReceipt {
        let empty = {
            let mut graph = self.graph.lock();
            *graph = SignalGraph::new();
            graph.to_graph_data()
        };
        let receipt = self.queue_persist(empty);
        self.events.emit(StoreEvent::GraphReset);
        receipt
    }

    /// Record a position for the node with `id` (layout write-back or user
    /// drag). Unknown id or mismatched kind is a no-op and returns `None`.
    pub fn update_position(
        &self,
        kind: NodeKind,
        id: Uuid,
        position: Point2D<f32>,
    ) -> Option<PersistReceipt> {
        let snapshot = {
            let mut graph = self.graph.lock();
            if !graph.set_position(kind, id, position) {
                return None;
            }
            graph.to_graph_data()
        };
        let receipt = self.queue_persist(snapshot);
        self.events.emit(StoreEvent::PositionChanged { kind, id });
        Some(receipt)
    }

    /// Case-insensitive substring search.
    ///
    /// Keywords match on text, mentions on text or context, websites on
    /// title or url — and a website is also included when any of *its*
    /// keywords or mentions match, even if its own title/url do not. An
    /// empty or whitespace query returns empty results; the unfiltered
    /// graph is available via [`snapshot`](Self::snapshot).
    pub fn search(&self, query: &str) -> SearchResults {
        let needle = normalize_text(query);
        if needle.is_empty() {
            return SearchResults::default();
        }

        let graph = self.graph.lock();
        let mut results = SearchResults::default();
        let mut matched_ids: HashSet<Uuid> = HashSet::new();

        for (_, keyword) in graph.keywords() {
            if keyword.text.contains(&needle) {
                matched_ids.insert(keyword.id);
                results.keywords.push(PersistedKeyword {
                    id: keyword.id,
                    text: keyword.text.clone(),
                    source_website_id: keyword.source_website,
                    position: keyword.position.map(Into::into),
                });
            }
        }

        for (_, mention) in graph.mentions() {
            if normalize_text(&mention.text).contains(&needle)
                || normalize_text(&mention.context).contains(&needle)
            {
                matched_ids.insert(mention.id);
                results.mentions.push(PersistedMention {
                    id: mention.id,
                    text: mention.text.clone(),
                    context: mention.context.clone(),
                    source_website_id: mention.source_website,
                    position: mention.position.map(Into::into),
                });
            }
        }

        // Websites whose own keywords/mentions matched, by edge ownership.
        let mut owning_websites: HashSet<Uuid> = HashSet::new();
        for edge in graph.edges() {
            let (Some(source), Some(target)) = (graph.get(edge.source), graph.get(edge.target))
            else {
                continue;
            };
            if matched_ids.contains(&target.id()) {
                owning_websites.insert(source.id());
            }
        }

        for (_, website) in graph.websites() {
            let direct = normalize_text(&website.title).contains(&needle)
                || normalize_text(&website.url).contains(&needle);
            if direct || owning_websites.contains(&website.id) {
                results.websites.push(PersistedWebsite {
                    id: website.id,
                    url: website.url.clone(),
                    title: website.title.clone(),
                    favicon: website.favicon.clone(),
                    visited_at: website.visited_at,
                    last_position: website.last_position.map(Into::into),
                });
            }
        }

        results
    }

    /// Read-only copy of the whole graph, the snapshot handed to the layout
    /// engine and to callers rendering the unfiltered view.
    pub fn snapshot(&self) -> GraphData {
        self.graph.lock().to_graph_data()
    }

    /// Subscribe to change events. Events emitted before the call are not
    /// replayed.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn queue_persist(&self, data: GraphData) -> PersistReceipt {
        let Some(jobs) = &self.jobs else {
            return PersistReceipt::already_failed(StorageError::Closed);
        };
        let (tx, rx) = bounded(1);
        let job = WriteJob { data, receipt: tx };
        if jobs.send(job).is_err() {
            warn!("Persistence writer is gone; dropping graph write");
            return PersistReceipt::already_failed(StorageError::Closed);
        }
        PersistReceipt { rx }
    }
}

impl Drop for GraphStore {
    fn drop(&mut self) {
        // Close the job channel so the writer drains and exits, then join
        // so queued writes land before the storage handle is released.
        self.jobs.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

fn run_writer(storage: Arc<dyn StorageBackend>, jobs: Receiver<WriteJob>) {
    for job in jobs {
        let result = serde_json::to_value(&job.data)
            .map_err(|e| StorageError::Serde(format!("{e}")))
            .and_then(|value| {
                storage.set(HashMap::from([(GRAPH_DATA_KEY.to_string(), value)]))
            });
        if let Err(e) = &result {
            warn!("Graph persistence write failed: {e}");
        }
        // Receiver may have been dropped (fire-and-forget); that is fine.
        let _ = job.receipt.send(result);
    }
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
