/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Merge semantics: identity stability, global keyword dedup, position
//! preservation, edge replacement.

use euclid::default::Point2D;
use sitegraph::NodeKind;

use crate::harness::{open_store, page, page_with_mentions};

#[test]
fn merging_same_url_twice_creates_one_website_and_stable_keyword_ids() {
    let (store, _storage) = open_store();
    let data = page("https://a.com", "A", &["rust", "graphs"]);

    let first = store.merge_page_data(&data).unwrap();
    let ids_after_first: Vec<_> = store.snapshot().keywords.iter().map(|k| k.id).collect();
    let second = store.merge_page_data(&data).unwrap();

    assert_eq!(first.website, second.website);
    let snapshot = store.snapshot();
    assert_eq!(snapshot.websites.len(), 1);
    let ids_after_second: Vec<_> = snapshot.keywords.iter().map(|k| k.id).collect();
    assert_eq!(ids_after_first, ids_after_second);
}

#[test]
fn keyword_differing_only_by_case_and_whitespace_is_one_node_with_edges_from_both_sites() {
    let (store, _storage) = open_store();

    store
        .merge_page_data(&page("https://a.com", "A", &["Rust"]))
        .unwrap();
    store
        .merge_page_data(&page("https://b.com", "B", &["  rust "]))
        .unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.keywords.len(), 1);
    assert_eq!(snapshot.keywords[0].text, "rust");
    assert_eq!(snapshot.website_to_keyword_edges.len(), 2);

    let keyword_id = snapshot.keywords[0].id;
    let mut sources: Vec<_> = snapshot
        .website_to_keyword_edges
        .iter()
        .filter(|e| e.target == keyword_id)
        .map(|e| e.source)
        .collect();
    sources.sort();
    sources.dedup();
    assert_eq!(sources.len(), 2);
}

#[test]
fn keyword_position_survives_remerge_of_same_text() {
    let (store, _storage) = open_store();
    store
        .merge_page_data(&page("https://a.com", "A", &["rust"]))
        .unwrap();
    let keyword_id = store.snapshot().keywords[0].id;
    store
        .update_position(NodeKind::Keyword, keyword_id, Point2D::new(10.0, 20.0))
        .unwrap();

    store
        .merge_page_data(&page("https://a.com", "A revisited", &["rust"]))
        .unwrap();

    let snapshot = store.snapshot();
    let position = snapshot.keywords[0].position.unwrap();
    assert_eq!((position.x, position.y), (10.0, 20.0));
}

#[test]
fn remerge_replaces_edge_set_instead_of_accumulating() {
    let (store, _storage) = open_store();
    store
        .merge_page_data(&page("https://w.com", "W", &["aaa", "bbb"]))
        .unwrap();

    store
        .merge_page_data(&page("https://w.com", "W", &["ccc"]))
        .unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.website_to_keyword_edges.len(), 1);
    let target = snapshot.website_to_keyword_edges[0].target;
    let kept = snapshot.keywords.iter().find(|k| k.id == target).unwrap();
    assert_eq!(kept.text, "ccc");
}

#[test]
fn short_keywords_are_dropped_at_the_boundary() {
    let (store, _storage) = open_store();

    store
        .merge_page_data(&page("https://a.com", "A", &["ai", "ml", "rust"]))
        .unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.keywords.len(), 1);
    assert_eq!(snapshot.keywords[0].text, "rust");
}

#[test]
fn mentions_stay_per_website_while_keywords_are_global() {
    let (store, _storage) = open_store();
    let mut a = page_with_mentions("https://a.com", "A", &[("GTM", "ctx on a")]);
    a.keywords = vec!["shared".to_string()];
    let mut b = page_with_mentions("https://b.com", "B", &[("GTM", "ctx on b")]);
    b.keywords = vec!["shared".to_string()];

    store.merge_page_data(&a).unwrap();
    store.merge_page_data(&b).unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.keywords.len(), 1);
    assert_eq!(snapshot.mentions.len(), 2);
}

#[test]
fn mention_position_survives_remerge_from_same_site() {
    let (store, _storage) = open_store();
    store
        .merge_page_data(&page_with_mentions("https://a.com", "A", &[("GTM", "old")]))
        .unwrap();
    let mention_id = store.snapshot().mentions[0].id;
    store
        .update_position(NodeKind::Mention, mention_id, Point2D::new(3.0, 4.0))
        .unwrap();

    store
        .merge_page_data(&page_with_mentions("https://a.com", "A", &[("gtm", "new")]))
        .unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.mentions.len(), 1);
    assert_eq!(snapshot.mentions[0].id, mention_id);
    assert_eq!(snapshot.mentions[0].context, "new");
    let position = snapshot.mentions[0].position.unwrap();
    assert_eq!((position.x, position.y), (3.0, 4.0));
}

#[test]
fn concurrent_merges_for_different_sites_share_one_keyword_node() {
    let (store, _storage) = open_store();

    // Several extraction results landing at once, every page emitting the
    // same keyword: the merge mutex must serialize lookup-before-insert so
    // exactly one node results.
    std::thread::scope(|scope| {
        for i in 0..8 {
            let store = &store;
            scope.spawn(move || {
                let url = format!("https://site{i}.example.com");
                store
                    .merge_page_data(&page(&url, "Site", &["shared", "common"]))
                    .unwrap();
            });
        }
    });

    let snapshot = store.snapshot();
    assert_eq!(snapshot.websites.len(), 8);
    assert_eq!(snapshot.keywords.len(), 2);
    assert_eq!(snapshot.website_to_keyword_edges.len(), 16);
    // Every website points at the same two shared nodes.
    let keyword_ids: std::collections::HashSet<_> =
        snapshot.keywords.iter().map(|k| k.id).collect();
    for edge in &snapshot.website_to_keyword_edges {
        assert!(keyword_ids.contains(&edge.target));
    }
}

#[test]
fn malformed_record_is_skipped_and_graph_unchanged() {
    let (store, _storage) = open_store();
    store
        .merge_page_data(&page("https://a.com", "A", &["rust"]))
        .unwrap();
    let before = store.snapshot();

    assert!(store.merge_page_data(&page("", "No url", &[])).is_err());
    assert!(store.merge_page_data(&page("https://b.com", "", &[])).is_err());
    assert!(
        store
            .merge_page_data(&page("not a url", "Bad", &[]))
            .is_err()
    );

    assert_eq!(store.snapshot(), before);
}

#[test]
fn reset_clears_everything_and_is_idempotent() {
    let (store, _storage) = open_store();
    store
        .merge_page_data(&page("https://a.com", "A", &["rust"]))
        .unwrap();

    store.reset().wait().unwrap();
    store.reset().wait().unwrap();

    assert!(store.snapshot().is_empty());
}
