/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Core engine for a browsing-companion graph.
//!
//! `sitegraph` folds extracted page signals (title, keywords, mentions) into
//! a persistent website/keyword/mention graph and positions that graph with a
//! deterministic force simulation for rendering.
//!
//! Components:
//! - [`store::GraphStore`]: canonical graph owner; atomic merge, search,
//!   reset, position updates, change events, background persistence
//! - [`layout::LayoutEngine`]: batch force layout with a fingerprint-keyed
//!   bounded cache
//! - [`storage::StorageBackend`]: the key-value boundary the host environment
//!   implements (an in-memory and a JSON-file backend ship with the crate)
//! - [`rank::Reranker`]: the relevance boundary; failures degrade to the
//!   store's own ordering, never to an error
//!
//! The browser-extension host, page scraping, remote LLM/rerank calls, and
//! all rendering live outside this crate and talk to it through the types
//! re-exported below.

pub mod events;
pub mod extract;
pub mod fingerprint;
pub mod graph;
pub mod layout;
pub mod rank;
pub mod storage;
pub mod store;

pub use events::StoreEvent;
pub use extract::{ExtractedMention, ExtractedPageData, PageDataError};
pub use fingerprint::{FingerprintBuilder, timestamp_fallback};
pub use graph::{GraphData, KeywordNode, MentionNode, NodeKind, WebsiteNode};
pub use layout::{
    EdgeStyle, LayoutEdge, LayoutEngine, LayoutResult, NodeStyle, PositionedNode, Viewport,
};
pub use rank::{
    IdentityReranker, RankError, RankedMatch, Reranker, rank_or_identity, ranked_search,
};
pub use storage::{FileStorage, MemoryStorage, StorageBackend, StorageChange, StorageError};
pub use store::{GraphStore, MergeOutcome, PersistReceipt, SearchResults};
