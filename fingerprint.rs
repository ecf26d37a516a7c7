/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Layout-cache fingerprints.
//!
//! The layout engine caches by exact fingerprint string; constructing the
//! string is the caller's job. [`FingerprintBuilder`] digests graph content
//! and content-filtering preferences, so any change to either produces a
//! different key and a stale layout is never served. When no semantic
//! fingerprint is available, [`timestamp_fallback`] yields a fresh key that
//! simply never hits the cache.

use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::graph::{GraphData, PersistedPosition};

/// Accumulates graph content and preference pairs into a SHA-256 hex key.
///
/// Folded per node: kind tag, id, identity text, and the stored position's
/// exact value (a drag or layout write-back must invalidate, since stored
/// positions seed the simulation). Folded per edge: id and endpoints.
#[derive(Default)]
pub struct FingerprintBuilder {
    hasher: Sha256,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a graph snapshot's content.
    pub fn graph(mut self, snapshot: &GraphData) -> Self {
        for website in &snapshot.websites {
            self.field("w", &website.id.to_string());
            self.field("url", &website.url);
            self.position(website.last_position);
        }
        for keyword in &snapshot.keywords {
            self.field("k", &keyword.id.to_string());
            self.field("text", &keyword.text);
            self.position(keyword.position);
        }
        for mention in &snapshot.mentions {
            self.field("m", &mention.id.to_string());
            self.field("text", &mention.text);
            self.position(mention.position);
        }
        for edge in snapshot
            .website_to_keyword_edges
            .iter()
            .chain(&snapshot.website_to_mention_edges)
        {
            self.field("e", &edge.id.to_string());
            self.field("src", &edge.source.to_string());
            self.field("dst", &edge.target.to_string());
        }
        self
    }

    /// Fold one content-filtering preference. Key and value both count.
    pub fn preference(mut self, key: &str, value: &str) -> Self {
        self.field("pref", key);
        self.field("val", value);
        self
    }

    /// Finish into a lowercase hex digest.
    pub fn finish(self) -> String {
        hex_string(&self.hasher.finalize())
    }

    fn field(&mut self, tag: &str, value: &str) {
        // Length-prefixed so ("ab","c") and ("a","bc") cannot collide.
        self.hasher.update(tag.as_bytes());
        self.hasher.update(value.len().to_be_bytes());
        self.hasher.update(value.as_bytes());
    }

    /// Fold a stored position's exact bits; any coordinate change changes
    /// the key.
    fn position(&mut self, position: Option<PersistedPosition>) {
        match position {
            Some(p) => {
                let encoded = format!("{:08x}:{:08x}", p.x.to_bits(), p.y.to_bits());
                self.field("pos", &encoded);
            },
            None => self.field("pos", "none"),
        }
    }
}

/// Fallback cache key when no semantic fingerprint is available: a
/// nanosecond timestamp, unique enough that the cache is simply bypassed.
pub fn timestamp_fallback() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("ts-{nanos}")
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
