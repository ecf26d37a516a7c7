/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Deterministic force layout with a fingerprint-keyed cache.
//!
//! [`LayoutEngine::compute_layout`] turns a graph snapshot into positioned
//! nodes for rendering. The expensive part is the batch force simulation,
//! so results are cached by the caller-supplied fingerprint string: an
//! exact fingerprint hit returns the cached `Arc` without touching the
//! simulation. The cache is bounded (LRU-style eviction via moka); callers
//! invalidate by switching fingerprints and may drop all entries with
//! [`LayoutEngine::invalidate_all`].
//!
//! Nodes without a stored position get a seed position hashed from
//! `"<kind>-<id>-<axis>"`, so the pre-simulation placement of any node is
//! identical across runs, platforms, and reloads.

mod simulation;

use euclid::default::Point2D;
use moka::sync::Cache;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::graph::{GraphData, NodeKind};

use simulation::SimNode;

/// Bounded cache entries kept by default.
const DEFAULT_CACHE_CAPACITY: u64 = 32;

/// Seed positions stay inside a margin of 10% of each viewport dimension.
const SEED_MARGIN_RATIO: f32 = 0.1;

/// Target viewport for a layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Rendering hints for a node. Not semantic; the presentation layer may
/// ignore them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStyle {
    pub radius: f32,
}

/// Rendering hints for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeStyle {
    /// Mention edges render dashed; keyword edges solid.
    pub dashed: bool,
}

/// A node annotated with its final layout position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedNode {
    pub id: Uuid,
    pub kind: NodeKind,
    pub label: String,
    pub position: Point2D<f32>,
    pub style: NodeStyle,
}

/// An edge passed through to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    pub id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
    pub style: EdgeStyle,
}

/// Output of one layout pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<LayoutEdge>,
}

/// Batch layout engine with a bounded, fingerprint-keyed result cache.
pub struct LayoutEngine {
    cache: Cache<String, Arc<LayoutResult>>,
    simulation_runs: AtomicU64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Engine with a caller-chosen cache bound (entries, not bytes).
    pub fn with_cache_capacity(capacity: u64) -> Self {
        Self {
            cache: Cache::new(capacity),
            simulation_runs: AtomicU64::new(0),
        }
    }

    /// Position every node in `snapshot` for `viewport`.
    ///
    /// An empty snapshot returns an empty result immediately, bypassing
    /// both the cache and the simulation. Otherwise an exact `fingerprint`
    /// hit returns the cached result; a miss seeds positions (stored
    /// position wins over the deterministic seed hash), runs the
    /// simulation to completion, and caches the result under `fingerprint`.
    pub fn compute_layout(
        &self,
        snapshot: &GraphData,
        viewport: Viewport,
        fingerprint: &str,
    ) -> Arc<LayoutResult> {
        if snapshot.is_empty() {
            return Arc::new(LayoutResult::default());
        }

        if let Some(cached) = self.cache.get(fingerprint) {
            return cached;
        }

        let result = Arc::new(self.run_layout(snapshot, viewport));
        self.cache.insert(fingerprint.to_string(), result.clone());
        result
    }

    /// Drop every cached layout. Called when preferences change and the
    /// caller wants to bound memory rather than wait for eviction.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// How many times the simulation has actually run. Cache hits and the
    /// empty-graph bypass do not increment it.
    pub fn simulation_runs(&self) -> u64 {
        self.simulation_runs.load(Ordering::Relaxed)
    }

    fn run_layout(&self, snapshot: &GraphData, viewport: Viewport) -> LayoutResult {
        let mut nodes = Vec::with_capacity(snapshot.node_count());
        let mut bodies = Vec::with_capacity(snapshot.node_count());
        let mut index_of: HashMap<Uuid, usize> = HashMap::with_capacity(snapshot.node_count());

        fn push_node(
            id: Uuid,
            kind: NodeKind,
            label: String,
            stored: Option<Point2D<f32>>,
            viewport: Viewport,
            nodes: &mut Vec<PositionedNode>,
            bodies: &mut Vec<SimNode>,
            index_of: &mut HashMap<Uuid, usize>,
        ) {
            let position = stored.unwrap_or_else(|| seed_position(kind, id, viewport));
            let style = NodeStyle {
                radius: node_radius(kind),
            };
            index_of.insert(id, nodes.len());
            bodies.push(SimNode::at(position, style.radius));
            nodes.push(PositionedNode {
                id,
                kind,
                label,
                position,
                style,
            });
        }

        for website in &snapshot.websites {
            push_node(
                website.id,
                NodeKind::Website,
                website.title.clone(),
                website.last_position.map(Into::into),
                viewport,
                &mut nodes,
                &mut bodies,
                &mut index_of,
            );
        }
        for keyword in &snapshot.keywords {
            push_node(
                keyword.id,
                NodeKind::Keyword,
                keyword.text.clone(),
                keyword.position.map(Into::into),
                viewport,
                &mut nodes,
                &mut bodies,
                &mut index_of,
            );
        }
        for mention in &snapshot.mentions {
            push_node(
                mention.id,
                NodeKind::Mention,
                mention.text.clone(),
                mention.position.map(Into::into),
                viewport,
                &mut nodes,
                &mut bodies,
                &mut index_of,
            );
        }

        let mut edges = Vec::with_capacity(snapshot.edge_count());
        let mut springs = Vec::with_capacity(snapshot.edge_count());
        let mut collect_edges = |rows: &[crate::graph::PersistedGraphEdge], dashed: bool| {
            for row in rows {
                // Dangling edges never persist, but a snapshot is caller
                // data; skip rather than panic.
                let (Some(&source), Some(&target)) =
                    (index_of.get(&row.source), index_of.get(&row.target))
                else {
                    continue;
                };
                springs.push((source, target));
                edges.push(LayoutEdge {
                    id: row.id,
                    source: row.source,
                    target: row.target,
                    style: EdgeStyle { dashed },
                });
            }
        };
        collect_edges(&snapshot.website_to_keyword_edges, false);
        collect_edges(&snapshot.website_to_mention_edges, true);

        simulation::run(&mut bodies, &springs, viewport);
        self.simulation_runs.fetch_add(1, Ordering::Relaxed);

        for (node, body) in nodes.iter_mut().zip(&bodies) {
            node.position = body.position;
        }

        LayoutResult { nodes, edges }
    }
}

/// Deterministic pseudo-random seed position for a node without a stored
/// one: each axis hashes `"<kind>-<id>-<axis>"` into
/// `[margin, dimension - margin]`. SHA-256 keeps the mapping identical
/// across platforms and Rust releases.
pub fn seed_position(kind: NodeKind, id: Uuid, viewport: Viewport) -> Point2D<f32> {
    Point2D::new(
        seed_axis(kind, id, "x", viewport.width),
        seed_axis(kind, id, "y", viewport.height),
    )
}

fn seed_axis(kind: NodeKind, id: Uuid, axis: &str, dimension: f32) -> f32 {
    let seed = format!("{}-{}-{}", kind.as_str(), id, axis);
    let digest = Sha256::digest(seed.as_bytes());
    let raw = u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"));
    let fraction = (raw as f64 / u64::MAX as f64) as f32;

    let margin = SEED_MARGIN_RATIO * dimension;
    margin + fraction * (dimension - 2.0 * margin)
}

fn node_radius(kind: NodeKind) -> f32 {
    match kind {
        NodeKind::Website => 24.0,
        NodeKind::Keyword => 14.0,
        NodeKind::Mention => 10.0,
    }
}
