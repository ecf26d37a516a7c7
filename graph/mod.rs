/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Graph data structures for accumulated browsing signals.
//!
//! Core structures:
//! - `SignalGraph`: graph container backed by petgraph::StableGraph
//! - `WebsiteNode` / `KeywordNode` / `MentionNode`: the three node kinds
//! - `EdgeLink`: website→keyword and website→mention connections
//!
//! Identity rules enforced here:
//! - websites are unique by `url`
//! - keywords are unique by normalized `text` across the whole graph
//! - mentions are unique by (normalized `text`, owning website id)
//!
//! Boundary: mutation methods are `pub(crate)` — the store is the single
//! write path; callers outside it would bypass the merge serialization.

use euclid::default::Point2D;
use log::debug;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use std::collections::HashMap;
use uuid::Uuid;

pub mod data;

pub use data::{
    GraphData, PersistedGraphEdge, PersistedKeyword, PersistedMention, PersistedPosition,
    PersistedWebsite,
};

/// Stable node handle (petgraph NodeIndex — survives other deletions)
pub type NodeKey = NodeIndex;

/// Stable edge handle (petgraph EdgeIndex)
pub type EdgeKey = EdgeIndex;

/// The three node kinds in a signal graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Website,
    Keyword,
    Mention,
}

impl NodeKind {
    /// Stable lowercase name, used in layout seed strings.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Website => "website",
            NodeKind::Keyword => "keyword",
            NodeKind::Mention => "mention",
        }
    }
}

/// A visited website.
#[derive(Debug, Clone, PartialEq)]
pub struct WebsiteNode {
    /// Stable node identity, minted on first visit.
    pub id: Uuid,

    /// Full URL; the merge identity key.
    pub url: String,

    /// Page title from the latest visit.
    pub title: String,

    /// Favicon URL, when the latest extraction reported one.
    pub favicon: Option<String>,

    /// Unix milliseconds of the latest visit.
    pub visited_at: u64,

    /// Position from the last layout pass or user drag; survives re-merges.
    pub last_position: Option<Point2D<f32>>,
}

/// A keyword shared by every website that emits it.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordNode {
    pub id: Uuid,

    /// Normalized (trimmed, lowercased) keyword text; the identity key.
    pub text: String,

    /// First website that produced this keyword. Informational only;
    /// identity is the text.
    pub source_website: Option<Uuid>,

    /// Position from a layout pass or user drag; survives re-merges.
    pub position: Option<Point2D<f32>>,
}

/// A mention, owned by exactly one website.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionNode {
    pub id: Uuid,

    /// Display text as extracted; identity uses the normalized form.
    pub text: String,

    /// Text surrounding the mention on the page.
    pub context: String,

    /// Owning website. Part of the identity key — the same phrase on a
    /// different site is a different mention.
    pub source_website: Uuid,

    /// Position from a layout pass or user drag; survives re-merges.
    pub position: Option<Point2D<f32>>,
}

/// Node payload stored in the petgraph container.
#[derive(Debug, Clone)]
pub enum NodeWeight {
    Website(WebsiteNode),
    Keyword(KeywordNode),
    Mention(MentionNode),
}

impl NodeWeight {
    pub fn id(&self) -> Uuid {
        match self {
            NodeWeight::Website(n) => n.id,
            NodeWeight::Keyword(n) => n.id,
            NodeWeight::Mention(n) => n.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeWeight::Website(_) => NodeKind::Website,
            NodeWeight::Keyword(_) => NodeKind::Keyword,
            NodeWeight::Mention(_) => NodeKind::Mention,
        }
    }
}

/// Edge kind: which node kind the website points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    WebsiteKeyword,
    WebsiteMention,
}

/// Edge payload: a stable id (regenerated when a website's edge set is
/// rebuilt) plus the edge kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLink {
    pub id: Uuid,
    pub kind: EdgeKind,
}

/// Read-only view of an edge with resolved endpoint keys.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView {
    pub id: Uuid,
    pub kind: EdgeKind,
    pub source: NodeKey,
    pub target: NodeKey,
}

/// Graph container plus the identity indices the merge path relies on.
#[derive(Clone, Default)]
pub struct SignalGraph {
    inner: StableGraph<NodeWeight, EdgeLink, Directed>,

    /// URL → website node (unique).
    website_by_url: HashMap<String, NodeKey>,

    /// Normalized keyword text → keyword node (globally unique).
    keyword_by_text: HashMap<String, NodeKey>,

    /// (normalized mention text, owning website id) → mention node.
    mention_by_key: HashMap<(String, Uuid), NodeKey>,

    /// Stable UUID → node, across all kinds.
    node_by_id: HashMap<Uuid, NodeKey>,
}

impl SignalGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or refresh the website node for `url`.
    ///
    /// On a repeat visit the id and any stored position are kept; title and
    /// `visited_at` are refreshed. A `Some` favicon replaces the stored one,
    /// `None` keeps it (a page that fails to report its icon once should not
    /// erase a known icon).
    pub(crate) fn upsert_website(
        &mut self,
        url: &str,
        title: &str,
        favicon: Option<&str>,
        visited_at: u64,
    ) -> NodeKey {
        if let Some(&key) = self.website_by_url.get(url) {
            if let Some(NodeWeight::Website(node)) = self.inner.node_weight_mut(key) {
                node.title = title.to_string();
                node.visited_at = visited_at;
                if let Some(icon) = favicon {
                    node.favicon = Some(icon.to_string());
                }
            }
            return key;
        }

        let id = Uuid::new_v4();
        let key = self.inner.add_node(NodeWeight::Website(WebsiteNode {
            id,
            url: url.to_string(),
            title: title.to_string(),
            favicon: favicon.map(str::to_string),
            visited_at,
            last_position: None,
        }));
        self.website_by_url.insert(url.to_string(), key);
        self.node_by_id.insert(id, key);
        key
    }

    /// Look up the keyword node for normalized `text`, creating it on first
    /// sight. Global uniqueness: the same text from two websites resolves to
    /// one shared node, and its stored position is untouched.
    pub(crate) fn lookup_or_create_keyword(
        &mut self,
        text: &str,
        source_website: Uuid,
    ) -> NodeKey {
        if let Some(&key) = self.keyword_by_text.get(text) {
            return key;
        }

        let id = Uuid::new_v4();
        let key = self.inner.add_node(NodeWeight::Keyword(KeywordNode {
            id,
            text: text.to_string(),
            source_website: Some(source_website),
            position: None,
        }));
        self.keyword_by_text.insert(text.to_string(), key);
        self.node_by_id.insert(id, key);
        key
    }

    /// Look up the mention node for (`normalized_text`, `website`), creating
    /// it on first sight. On a repeat sighting the stored position and id are
    /// kept; the context is refreshed to the latest extraction.
    pub(crate) fn lookup_or_create_mention(
        &mut self,
        display_text: &str,
        normalized_text: &str,
        context: &str,
        website: Uuid,
    ) -> NodeKey {
        let identity = (normalized_text.to_string(), website);
        if let Some(&key) = self.mention_by_key.get(&identity) {
            if let Some(NodeWeight::Mention(node)) = self.inner.node_weight_mut(key) {
                node.context = context.to_string();
            }
            return key;
        }

        let id = Uuid::new_v4();
        let key = self.inner.add_node(NodeWeight::Mention(MentionNode {
            id,
            text: display_text.to_string(),
            context: context.to_string(),
            source_website: website,
            position: None,
        }));
        self.mention_by_key.insert(identity, key);
        self.node_by_id.insert(id, key);
        key
    }

    /// Replace every outgoing edge of `kind` from `website` with edges to
    /// `targets`. The old edge set is removed wholesale — edges are never
    /// merged incrementally within one update.
    pub(crate) fn replace_website_edges(
        &mut self,
        website: NodeKey,
        kind: EdgeKind,
        targets: &[NodeKey],
    ) {
        let stale: Vec<EdgeKey> = self
            .inner
            .edges_directed(website, Direction::Outgoing)
            .filter(|edge| edge.weight().kind == kind)
            .map(|edge| edge.id())
            .collect();
        for edge in stale {
            self.inner.remove_edge(edge);
        }

        for &target in targets {
            if !self.inner.contains_node(target) {
                continue;
            }
            self.inner.add_edge(
                website,
                target,
                EdgeLink {
                    id: Uuid::new_v4(),
                    kind,
                },
            );
        }
    }

    /// Set the stored position for the node with `id`, if its kind matches.
    /// Returns whether anything changed.
    pub(crate) fn set_position(
        &mut self,
        kind: NodeKind,
        id: Uuid,
        position: Point2D<f32>,
    ) -> bool {
        let Some(&key) = self.node_by_id.get(&id) else {
            return false;
        };
        match (kind, self.inner.node_weight_mut(key)) {
            (NodeKind::Website, Some(NodeWeight::Website(node))) => {
                node.last_position = Some(position);
                true
            }
            (NodeKind::Keyword, Some(NodeWeight::Keyword(node))) => {
                node.position = Some(position);
                true
            }
            (NodeKind::Mention, Some(NodeWeight::Mention(node))) => {
                node.position = Some(position);
                true
            }
            _ => false,
        }
    }

    /// Get a node weight by key.
    pub fn get(&self, key: NodeKey) -> Option<&NodeWeight> {
        self.inner.node_weight(key)
    }

    /// Get a node by its stable UUID.
    pub fn get_by_id(&self, id: Uuid) -> Option<(NodeKey, &NodeWeight)> {
        let key = *self.node_by_id.get(&id)?;
        Some((key, self.inner.node_weight(key)?))
    }

    /// Get the website node for a URL.
    pub fn website_by_url(&self, url: &str) -> Option<(NodeKey, &WebsiteNode)> {
        let key = *self.website_by_url.get(url)?;
        match self.inner.node_weight(key)? {
            NodeWeight::Website(node) => Some((key, node)),
            _ => None,
        }
    }

    /// Get the keyword node for normalized text.
    pub fn keyword_by_text(&self, text: &str) -> Option<(NodeKey, &KeywordNode)> {
        let key = *self.keyword_by_text.get(text)?;
        match self.inner.node_weight(key)? {
            NodeWeight::Keyword(node) => Some((key, node)),
            _ => None,
        }
    }

    /// Get the mention node for (normalized text, owning website id).
    pub fn mention_by_key(&self, text: &str, website: Uuid) -> Option<(NodeKey, &MentionNode)> {
        let key = *self.mention_by_key.get(&(text.to_string(), website))?;
        match self.inner.node_weight(key)? {
            NodeWeight::Mention(node) => Some((key, node)),
            _ => None,
        }
    }

    /// Iterate all nodes as (key, weight) pairs.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &NodeWeight)> {
        self.inner
            .node_indices()
            .map(move |idx| (idx, &self.inner[idx]))
    }

    /// Iterate websites.
    pub fn websites(&self) -> impl Iterator<Item = (NodeKey, &WebsiteNode)> {
        self.nodes().filter_map(|(key, weight)| match weight {
            NodeWeight::Website(node) => Some((key, node)),
            _ => None,
        })
    }

    /// Iterate keywords.
    pub fn keywords(&self) -> impl Iterator<Item = (NodeKey, &KeywordNode)> {
        self.nodes().filter_map(|(key, weight)| match weight {
            NodeWeight::Keyword(node) => Some((key, node)),
            _ => None,
        })
    }

    /// Iterate mentions.
    pub fn mentions(&self) -> impl Iterator<Item = (NodeKey, &MentionNode)> {
        self.nodes().filter_map(|(key, weight)| match weight {
            NodeWeight::Mention(node) => Some((key, node)),
            _ => None,
        })
    }

    /// Iterate all edges as [`EdgeView`]s.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView> + '_ {
        self.inner.edge_references().map(|e| EdgeView {
            id: e.weight().id,
            kind: e.weight().kind,
            source: e.source(),
            target: e.target(),
        })
    }

    /// Outgoing edge targets of one kind for a website node.
    pub fn edge_targets(&self, website: NodeKey, kind: EdgeKind) -> Vec<NodeKey> {
        self.inner
            .edges_directed(website, Direction::Outgoing)
            .filter(|edge| edge.weight().kind == kind)
            .map(|edge| edge.target())
            .collect()
    }

    /// Count of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Count of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Serialize the graph to its persistable/snapshot form.
    pub fn to_graph_data(&self) -> GraphData {
        let mut data = GraphData::default();

        for (_, weight) in self.nodes() {
            match weight {
                NodeWeight::Website(node) => data.websites.push(PersistedWebsite {
                    id: node.id,
                    url: node.url.clone(),
                    title: node.title.clone(),
                    favicon: node.favicon.clone(),
                    visited_at: node.visited_at,
                    last_position: node.last_position.map(Into::into),
                }),
                NodeWeight::Keyword(node) => data.keywords.push(PersistedKeyword {
                    id: node.id,
                    text: node.text.clone(),
                    source_website_id: node.source_website,
                    position: node.position.map(Into::into),
                }),
                NodeWeight::Mention(node) => data.mentions.push(PersistedMention {
                    id: node.id,
                    text: node.text.clone(),
                    context: node.context.clone(),
                    source_website_id: node.source_website,
                    position: node.position.map(Into::into),
                }),
            }
        }

        for edge in self.edges() {
            let (Some(source), Some(target)) = (self.get(edge.source), self.get(edge.target))
            else {
                continue;
            };
            let persisted = PersistedGraphEdge {
                id: edge.id,
                source: source.id(),
                target: target.id(),
            };
            match edge.kind {
                EdgeKind::WebsiteKeyword => data.website_to_keyword_edges.push(persisted),
                EdgeKind::WebsiteMention => data.website_to_mention_edges.push(persisted),
            }
        }

        data
    }

    /// Rebuild a graph from its persisted form.
    ///
    /// Rows that would violate an identity invariant (duplicate url, duplicate
    /// normalized keyword text, duplicate mention key, reused id) are skipped,
    /// as are mentions whose owning website is missing and edges with a
    /// missing endpoint — a damaged blob degrades to the valid subset instead
    /// of poisoning the graph.
    pub fn from_graph_data(data: &GraphData) -> Self {
        let mut graph = Self::new();

        for row in &data.websites {
            if graph.website_by_url.contains_key(&row.url)
                || graph.node_by_id.contains_key(&row.id)
            {
                debug!("Skipping duplicate persisted website row for '{}'", row.url);
                continue;
            }
            let key = graph.inner.add_node(NodeWeight::Website(WebsiteNode {
                id: row.id,
                url: row.url.clone(),
                title: row.title.clone(),
                favicon: row.favicon.clone(),
                visited_at: row.visited_at,
                last_position: row.last_position.map(Into::into),
            }));
            graph.website_by_url.insert(row.url.clone(), key);
            graph.node_by_id.insert(row.id, key);
        }

        for row in &data.keywords {
            let text = crate::extract::normalize_text(&row.text);
            if text.is_empty()
                || graph.keyword_by_text.contains_key(&text)
                || graph.node_by_id.contains_key(&row.id)
            {
                debug!("Skipping duplicate persisted keyword row '{}'", row.text);
                continue;
            }
            let key = graph.inner.add_node(NodeWeight::Keyword(KeywordNode {
                id: row.id,
                text: text.clone(),
                source_website: row.source_website_id,
                position: row.position.map(Into::into),
            }));
            graph.keyword_by_text.insert(text, key);
            graph.node_by_id.insert(row.id, key);
        }

        for row in &data.mentions {
            let identity = (
                crate::extract::normalize_text(&row.text),
                row.source_website_id,
            );
            let owner_exists = matches!(
                graph.get_by_id(row.source_website_id),
                Some((_, NodeWeight::Website(_)))
            );
            if identity.0.is_empty()
                || !owner_exists
                || graph.mention_by_key.contains_key(&identity)
                || graph.node_by_id.contains_key(&row.id)
            {
                debug!("Skipping unusable persisted mention row '{}'", row.text);
                continue;
            }
            let key = graph.inner.add_node(NodeWeight::Mention(MentionNode {
                id: row.id,
                text: row.text.clone(),
                context: row.context.clone(),
                source_website: row.source_website_id,
                position: row.position.map(Into::into),
            }));
            graph.mention_by_key.insert(identity, key);
            graph.node_by_id.insert(row.id, key);
        }

        graph.restore_edges(&data.website_to_keyword_edges, EdgeKind::WebsiteKeyword);
        graph.restore_edges(&data.website_to_mention_edges, EdgeKind::WebsiteMention);

        graph
    }

    fn restore_edges(&mut self, rows: &[PersistedGraphEdge], kind: EdgeKind) {
        let expected = match kind {
            EdgeKind::WebsiteKeyword => NodeKind::Keyword,
            EdgeKind::WebsiteMention => NodeKind::Mention,
        };
        for row in rows {
            let source = self.get_by_id(row.source).map(|(k, w)| (k, w.kind()));
            let target = self.get_by_id(row.target).map(|(k, w)| (k, w.kind()));
            let (Some((source_key, source_kind)), Some((target_key, target_kind))) =
                (source, target)
            else {
                debug!("Dropping persisted edge with missing endpoint");
                continue;
            };
            if source_kind != NodeKind::Website || target_kind != expected {
                debug!("Dropping persisted edge with mismatched endpoint kinds");
                continue;
            }
            self.inner
                .add_edge(source_key, target_key, EdgeLink { id: row.id, kind });
        }
    }
}
