/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Extraction boundary: the per-page signal record delivered by the host.
//!
//! The host environment scrapes each visited page and hands the result over
//! as one [`ExtractedPageData`]. This module owns validation of that record
//! and the normalization rules applied to keyword and mention text before
//! they reach the graph.

use url::Url;

/// Keywords shorter than this (after trim + lowercase) are dropped.
pub const MIN_KEYWORD_CHARS: usize = 3;

/// A short extracted phrase plus the text surrounding it on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMention {
    pub text: String,
    pub context: String,
}

/// One page visit's extracted signals.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPageData {
    /// Full URL of the visited page.
    pub url: String,

    /// Page title as scraped.
    pub title: String,

    /// Favicon URL, when one was found.
    pub favicon: Option<String>,

    /// Raw keyword strings; normalized and de-duplicated during merge.
    pub keywords: Vec<String>,

    /// Extracted mentions with their surrounding context.
    pub mentions: Vec<ExtractedMention>,

    /// Main textual content of the page, when extraction captured it.
    /// Not stored in the graph; carried for downstream consumers.
    pub main_content: Option<String>,
}

/// Rejection reasons for a malformed extraction record.
///
/// A rejected record is skipped entirely: the graph is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDataError {
    MissingUrl,
    MissingTitle,
    InvalidUrl(String),
}

impl std::fmt::Display for PageDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageDataError::MissingUrl => write!(f, "extraction record has no url"),
            PageDataError::MissingTitle => write!(f, "extraction record has no title"),
            PageDataError::InvalidUrl(url) => write!(f, "url is not absolute: '{url}'"),
        }
    }
}

impl std::error::Error for PageDataError {}

impl ExtractedPageData {
    /// Check the record is mergeable: non-empty title and an absolute URL.
    pub fn validate(&self) -> Result<(), PageDataError> {
        if self.url.trim().is_empty() {
            return Err(PageDataError::MissingUrl);
        }
        if self.title.trim().is_empty() {
            return Err(PageDataError::MissingTitle);
        }
        if Url::parse(self.url.trim()).is_err() {
            return Err(PageDataError::InvalidUrl(self.url.clone()));
        }
        Ok(())
    }

    /// Keywords normalized for graph identity: trimmed, lowercased, entries
    /// under [`MIN_KEYWORD_CHARS`] dropped, duplicates within the page
    /// collapsed (first occurrence wins).
    pub fn normalized_keywords(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for raw in &self.keywords {
            let normalized = normalize_text(raw);
            if normalized.chars().count() < MIN_KEYWORD_CHARS {
                continue;
            }
            if !seen.contains(&normalized) {
                seen.push(normalized);
            }
        }
        seen
    }

    /// Mentions with empty text dropped and duplicates (by normalized text)
    /// within the page collapsed. Display casing is preserved; only the
    /// identity key is normalized.
    pub fn deduplicated_mentions(&self) -> Vec<&ExtractedMention> {
        let mut keys = Vec::new();
        let mut out = Vec::new();
        for mention in &self.mentions {
            let key = normalize_text(&mention.text);
            if key.is_empty() || keys.contains(&key) {
                continue;
            }
            keys.push(key);
            out.push(mention);
        }
        out
    }
}

/// Canonical text form used for identity lookups: trim + lowercase.
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}
