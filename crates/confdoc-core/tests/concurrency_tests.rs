//! Serialization of overlapping mutations.

use std::time::Duration;

use confdoc_core::ConfigDocument;
use confdoc_test_utils::*;
use pretty_assertions::assert_eq;
use serde_json::json;

const SETTLE: Duration = Duration::from_secs(2);

#[tokio::test]
async fn overlapping_patches_commit_in_issue_order() {
    let doc = document(server_schema());
    let first = doc.patch("extra.order", json!("first")).unwrap();
    let second = doc.patch("extra.order", json!("second")).unwrap();

    // Polling the later mutation first must not let it jump the queue
    let (second, first) = tokio::join!(second, first);
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.next["extra"]["order"], json!("first"));
    assert!(second.previous.same_commit(&first.next));
    assert_eq!(doc.get()["extra"]["order"], json!("second"));
}

#[tokio::test]
async fn later_mutation_awaited_alone_runs_earlier_first() {
    let doc = document(server_schema());
    let first = doc.patch("extra.order", json!("first")).unwrap();
    let second = doc.patch("extra.order", json!("second")).unwrap();

    let second = tokio::time::timeout(SETTLE, second)
        .await
        .expect("later mutation must not wait on an unawaited earlier one")
        .unwrap();
    assert_eq!(second.previous["extra"]["order"], json!("first"));
    assert_eq!(doc.get()["extra"]["order"], json!("second"));
    assert_eq!(doc.pending_mutations(), 0);

    // Already committed by the later await
    let first = tokio::time::timeout(SETTLE, first).await.unwrap().unwrap();
    assert!(first.next.same_commit(&second.previous));
}

#[tokio::test]
async fn held_mutation_survives_other_awaits() {
    let doc = document(server_schema());
    let held = doc.set(json!({"host": "held.example"})).unwrap();

    let port = tokio::time::timeout(SETTLE, doc.patch("port", json!(9000)).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(port.previous["host"], json!("held.example"));

    let removed = tokio::time::timeout(SETTLE, doc.remove("extra").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed["port"], json!(9000));

    let held = tokio::time::timeout(SETTLE, held).await.unwrap().unwrap();
    assert_eq!(held["host"], json!("held.example"));
    assert_eq!(held["port"], json!(8080));
    assert_eq!(doc.get()["host"], json!("held.example"));
}

#[tokio::test]
async fn unawaited_merges_do_not_lose_updates() {
    let doc = document(server_schema());
    let pending: Vec<_> = (0..8)
        .map(|i| doc.patch(format!("extra.k{i}"), json!(i.to_string())).unwrap())
        .collect();
    for result in futures::future::join_all(pending).await {
        result.unwrap();
    }

    let extra = doc.get()["extra"].clone();
    assert_eq!(extra.as_object().unwrap().len(), 8);
    assert_eq!(extra["k7"], json!("7"));
}

#[tokio::test]
async fn reads_do_not_wait_for_a_parked_hook() {
    let gate = Gate::default();
    let doc = ConfigDocument::builder(server_schema())
        .before_update(gate.clone())
        .build()
        .unwrap();

    let first = tokio::spawn(doc.patch("host", json!("a.example")).unwrap());
    gate.entered().await;
    assert_eq!(doc.get()["host"], json!("localhost"));
    assert!(doc.has("host").unwrap());

    let second = tokio::spawn(doc.patch("host", json!("b.example")).unwrap());
    assert_eq!(doc.pending_mutations(), 2);

    gate.open();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first.next["host"], json!("a.example"));

    gate.entered().await;
    gate.open();
    let second = second.await.unwrap().unwrap();
    assert_eq!(second.previous["host"], json!("a.example"));
    assert_eq!(doc.get()["host"], json!("b.example"));
    assert_eq!(doc.pending_mutations(), 0);
}

#[tokio::test]
async fn bypass_views_share_the_write_queue() {
    let doc = restricted_document();
    let view = doc.bypass();
    let guarded = view.patch("s.b.c", json!("x")).unwrap();
    let open = doc.patch("s.a", json!("y")).unwrap();
    assert_eq!(doc.pending_mutations(), 2);

    let (open, guarded) = tokio::join!(open, guarded);
    guarded.unwrap();
    assert_eq!(open.unwrap().next["s"]["b"]["c"], json!("x"));
    assert_eq!(view.get(), doc.get().to_value());
}

#[tokio::test]
async fn separate_documents_are_independent() {
    let gate = Gate::default();
    let parked = ConfigDocument::builder(server_schema())
        .before_update(gate.clone())
        .build()
        .unwrap();
    let free = document(server_schema());

    let stalled = tokio::spawn(parked.patch("port", json!(1)).unwrap());
    gate.entered().await;
    free.patch("port", json!(2)).unwrap().await.unwrap();
    assert_eq!(free.get()["port"], json!(2));

    gate.open();
    stalled.await.unwrap().unwrap();
    assert_eq!(parked.get()["port"], json!(1));
}
