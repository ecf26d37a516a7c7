/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Persisted form of the signal graph.
//!
//! These rows are what crosses the storage boundary and what external
//! callers see in snapshots, so the JSON field names are camelCase and
//! stable. Geometry is flattened to plain `{x, y}` pairs here; the euclid
//! types stay internal.

use euclid::default::Point2D;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage key under which the whole graph blob lives.
pub const GRAPH_DATA_KEY: &str = "graphData";

/// A stored 2D position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedPosition {
    pub x: f32,
    pub y: f32,
}

impl From<Point2D<f32>> for PersistedPosition {
    fn from(point: Point2D<f32>) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }
}

impl From<PersistedPosition> for Point2D<f32> {
    fn from(position: PersistedPosition) -> Self {
        Point2D::new(position.x, position.y)
    }
}

/// Persisted website row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedWebsite {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Unix milliseconds of the latest visit.
    pub visited_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_position: Option<PersistedPosition>,
}

/// Persisted keyword row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedKeyword {
    pub id: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_website_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PersistedPosition>,
}

/// Persisted mention row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedMention {
    pub id: Uuid,
    pub text: String,
    pub context: String,
    pub source_website_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PersistedPosition>,
}

/// Persisted edge row: website id → keyword or mention id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedGraphEdge {
    pub id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
}

/// The whole graph as one serializable value — the unit of persistence
/// and the snapshot handed to external callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    #[serde(default)]
    pub websites: Vec<PersistedWebsite>,
    #[serde(default)]
    pub keywords: Vec<PersistedKeyword>,
    #[serde(default)]
    pub mentions: Vec<PersistedMention>,
    #[serde(default)]
    pub website_to_keyword_edges: Vec<PersistedGraphEdge>,
    #[serde(default)]
    pub website_to_mention_edges: Vec<PersistedGraphEdge>,
}

impl GraphData {
    /// Total node count across all kinds.
    pub fn node_count(&self) -> usize {
        self.websites.len() + self.keywords.len() + self.mentions.len()
    }

    /// Total edge count across both edge lists.
    pub fn edge_count(&self) -> usize {
        self.website_to_keyword_edges.len() + self.website_to_mention_edges.len()
    }

    /// True when the graph holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }
}
