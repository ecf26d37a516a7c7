/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Relevance boundary.
//!
//! A [`Reranker`] orders candidate texts by relevance to a query. The
//! remote implementation (rerank HTTP API) lives with the host; this crate
//! only defines the seam and the degrade policy: a ranker failure or a
//! malformed index list falls back to the store's own ordering, never to an
//! error the caller has to handle.

use log::warn;
use uuid::Uuid;

use crate::graph::NodeKind;
use crate::store::{GraphStore, SearchResults};

/// Ranker failure. Always degraded, never propagated past
/// [`rank_or_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    Unavailable(String),
}

impl std::fmt::Display for RankError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankError::Unavailable(e) => write!(f, "Ranker unavailable: {e}"),
        }
    }
}

impl std::error::Error for RankError {}

/// Orders `candidates` by relevance to `query`, most relevant first, as
/// indices into the candidate slice.
pub trait Reranker: Send + Sync {
    fn rank(&self, query: &str, candidates: &[String]) -> Result<Vec<usize>, RankError>;
}

/// The no-op ranker: candidates in their original order.
pub struct IdentityReranker;

impl Reranker for IdentityReranker {
    fn rank(&self, _query: &str, candidates: &[String]) -> Result<Vec<usize>, RankError> {
        Ok((0..candidates.len()).collect())
    }
}

/// Rank with degrade-to-identity semantics.
///
/// The returned permutation always covers every candidate exactly once:
/// out-of-range indices are dropped, duplicates keep their first
/// occurrence, omitted candidates are appended in original order. A ranker
/// error is warn-logged and yields the identity order.
pub fn rank_or_identity(
    reranker: &dyn Reranker,
    query: &str,
    candidates: &[String],
) -> Vec<usize> {
    let ranked = match reranker.rank(query, candidates) {
        Ok(indices) => indices,
        Err(e) => {
            warn!("Reranker failed, keeping original order: {e}");
            return (0..candidates.len()).collect();
        },
    };

    let mut seen = vec![false; candidates.len()];
    let mut order = Vec::with_capacity(candidates.len());
    for index in ranked {
        if index < candidates.len() && !seen[index] {
            seen[index] = true;
            order.push(index);
        }
    }
    for (index, taken) in seen.iter().enumerate() {
        if !taken {
            order.push(index);
        }
    }
    order
}

/// One entry in a ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch {
    pub kind: NodeKind,
    pub id: Uuid,
    pub label: String,
}

/// The search/chat candidate path: store search, then rerank.
///
/// Candidates are flattened websites-then-keywords-then-mentions; the
/// ranker sees each node's searchable text (mention context included). On
/// ranker failure the store's order is kept.
pub fn ranked_search(
    store: &GraphStore,
    reranker: &dyn Reranker,
    query: &str,
) -> Vec<RankedMatch> {
    let results = store.search(query);
    let (matches, candidates) = flatten_results(&results);
    let order = rank_or_identity(reranker, query, &candidates);
    order.into_iter().map(|i| matches[i].clone()).collect()
}

fn flatten_results(results: &SearchResults) -> (Vec<RankedMatch>, Vec<String>) {
    let mut matches = Vec::new();
    let mut candidates = Vec::new();

    for website in &results.websites {
        matches.push(RankedMatch {
            kind: NodeKind::Website,
            id: website.id,
            label: website.title.clone(),
        });
        candidates.push(format!("{} {}", website.title, website.url));
    }
    for keyword in &results.keywords {
        matches.push(RankedMatch {
            kind: NodeKind::Keyword,
            id: keyword.id,
            label: keyword.text.clone(),
        });
        candidates.push(keyword.text.clone());
    }
    for mention in &results.mentions {
        matches.push(RankedMatch {
            kind: NodeKind::Mention,
            id: mention.id,
            label: mention.text.clone(),
        });
        candidates.push(format!("{} {}", mention.text, mention.context));
    }

    (matches, candidates)
}
