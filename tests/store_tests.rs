//! Properties of the pure feed structures: dedup, ordering, value-replace
//! updates, and thread derivation.

use chrono::{DateTime, TimeZone, Utc};
use feedsync::core::models::{Message, UserInfo};
use feedsync::sync::MessageStore;
use feedsync::sync::threads::thread_messages;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn msg(id: &str, channel_id: &str, author_id: &str, secs: i64) -> Message {
    Message {
        id: id.to_string(),
        channel_id: channel_id.to_string(),
        author_id: author_id.to_string(),
        author_display_name: author_id.to_string(),
        author_avatar_url: None,
        text: String::new(),
        timestamp: ts(secs),
        is_read: false,
        attachments: Vec::new(),
        thread_parent_id: None,
        is_thread_parent: false,
        reply_count: 0,
        reactions: Vec::new(),
    }
}

#[test]
fn test_replace_all_dedups_and_sorts_descending() {
    let mut store = MessageStore::default();
    store.replace_all(vec![
        msg("m1", "C1", "U1", 100),
        msg("m3", "C1", "U1", 300),
        msg("m1", "C1", "U1", 100),
        msg("m2", "C2", "U2", 200),
    ]);

    let ids: Vec<&str> = store.messages().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m3", "m2", "m1"]);
    assert_eq!(store.len(), 3);
}

#[test]
fn test_merge_new_skips_known_ids_and_reports_inserted() {
    let mut store = MessageStore::default();
    store.replace_all(vec![msg("m2", "C1", "U1", 200), msg("m1", "C1", "U1", 100)]);

    let inserted = store.merge_new(vec![
        msg("m3", "C1", "U1", 300),
        msg("m2", "C1", "U1", 200),
    ]);

    assert_eq!(inserted, vec!["m3"]);
    let ids: Vec<&str> = store.messages().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m3", "m2", "m1"]);
}

#[test]
fn test_update_stores_replacement_value_at_same_id() {
    let mut store = MessageStore::default();
    store.replace_all(vec![msg("m1", "C1", "U1", 100)]);

    assert!(store.update("m1", |m| m.with_read(true)));
    assert!(store.get("m1").unwrap().is_read);
    assert_eq!(store.unread_count(), 0);

    assert!(!store.update("missing", |m| m));
}

#[test]
fn test_apply_author_replaces_only_that_authors_messages() {
    let mut store = MessageStore::default();
    store.replace_all(vec![
        msg("m1", "C1", "U1", 100),
        msg("m2", "C1", "U2", 200),
        msg("m3", "C1", "U1", 300),
    ]);

    let info = UserInfo {
        display_name: "Alice".to_string(),
        avatar_url: Some("https://example.com/a.png".to_string()),
    };
    let replaced = store.apply_author("U1", &info);

    assert_eq!(replaced, 2);
    assert_eq!(store.get("m1").unwrap().author_display_name, "Alice");
    assert_eq!(store.get("m3").unwrap().author_display_name, "Alice");
    assert_eq!(store.get("m2").unwrap().author_display_name, "U2");
}

#[test]
fn test_unresolved_authors_are_distinct() {
    let mut store = MessageStore::default();
    store.replace_all(vec![
        msg("m1", "C1", "U1", 100),
        msg("m2", "C1", "U1", 200),
        msg("m3", "C1", "U2", 300),
    ]);

    let mut unresolved = store.unresolved_authors();
    unresolved.sort();
    assert_eq!(unresolved, vec!["U1", "U2"]);

    store.apply_author(
        "U1",
        &UserInfo {
            display_name: "Alice".to_string(),
            avatar_url: None,
        },
    );
    assert_eq!(store.unresolved_authors(), vec!["U2"]);
}

#[test]
fn test_newest_timestamp_is_per_channel() {
    let mut store = MessageStore::default();
    store.replace_all(vec![
        msg("m1", "C1", "U1", 100),
        msg("m2", "C2", "U1", 500),
        msg("m3", "C1", "U1", 300),
    ]);

    assert_eq!(store.newest_timestamp_for("C1"), Some(ts(300)));
    assert_eq!(store.newest_timestamp_for("C2"), Some(ts(500)));
    assert_eq!(store.newest_timestamp_for("C3"), None);
}

#[test]
fn test_thread_messages_sorted_ascending() {
    let mut parent = msg("p", "C1", "U1", 100);
    parent.is_thread_parent = true;
    let mut late = msg("r2", "C1", "U2", 300);
    late.thread_parent_id = Some("p".to_string());
    let mut early = msg("r1", "C1", "U1", 200);
    early.thread_parent_id = Some("p".to_string());

    let feed = vec![late.clone(), early.clone(), parent.clone()];
    let thread = thread_messages(&feed, "p");

    let ids: Vec<&str> = thread.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["p", "r1", "r2"]);
}

#[test]
fn test_thread_messages_parent_paginated_out_returns_children() {
    let mut reply = msg("r1", "C1", "U1", 200);
    reply.thread_parent_id = Some("gone".to_string());

    let thread = thread_messages(&[reply], "gone");

    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].id, "r1");
}

#[test]
fn test_thread_messages_unknown_parent_is_empty_not_error() {
    let feed = vec![msg("m1", "C1", "U1", 100)];
    assert!(thread_messages(&feed, "nope").is_empty());
}
