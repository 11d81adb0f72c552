//! End-to-end document scenarios.

use confdoc_core::{ConfigDocument, ConfigError};
use confdoc_test_utils::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn seeded_value_and_defaults() {
    let doc = ConfigDocument::new(defaulted_string_schema(), Some(json!({"a": "test"}))).unwrap();
    assert_eq!(doc.get(), json!({"a": "test"}));
    assert_eq!(doc.defaults(), json!({"a": "b"}));
}

#[tokio::test]
async fn nested_defaults_survive_patch_and_closed_objects_reject_unknown_paths() {
    let doc = document(nested_defaults_schema());
    doc.patch("s.a", json!("c")).unwrap().await.unwrap();
    assert_eq!(
        doc.get(),
        json!({"s": {"a": "c", "b": {"c": "d", "e": "f"}}})
    );

    // Unknown paths are only discovered once the mutation runs
    let pending = doc.patch("s.s.s", json!("c")).unwrap();
    let err = pending.await.unwrap_err();
    assert!(matches!(err, ConfigError::UnresolvedPath { ref path } if path.to_string() == "s.s"));
    assert_eq!(err.status_code(), 400);
    assert_eq!(
        doc.get(),
        json!({"s": {"a": "c", "b": {"c": "d", "e": "f"}}})
    );
}

#[tokio::test]
async fn array_elements_patch_in_place_and_arrays_replace_whole() {
    let doc = document(methods_schema());
    doc.patch("methods[0]", json!("POST")).unwrap().await.unwrap();
    assert_eq!(doc.get()["methods"], json!(["POST", "PATCH"]));

    doc.patch("methods", json!(["GET", "DELETE"])).unwrap().await.unwrap();
    assert_eq!(doc.get()["methods"], json!(["GET", "DELETE"]));
}

#[tokio::test]
async fn restricted_prefix_needs_bypass_every_time() {
    let doc = restricted_document();
    let err = doc.patch("s.b.c", json!("e")).unwrap_err();
    assert!(matches!(err, ConfigError::Restricted { .. }));
    assert_eq!(err.status_code(), 403);

    doc.bypass().patch("s.b.c", json!("e")).unwrap().await.unwrap();
    assert_eq!(doc.get()["s"]["b"]["c"], json!("e"));

    assert!(matches!(
        doc.patch("s.b.c", json!("f")),
        Err(ConfigError::Restricted { .. })
    ));
    assert_eq!(doc.get()["s"]["b"]["c"], json!("e"));
}

#[tokio::test]
async fn before_hook_augments_set_and_patch() {
    let doc = ConfigDocument::builder(methods_schema())
        .before_update(AppendMethod("OPTIONS"))
        .build()
        .unwrap();

    let next = doc.set(json!({"methods": ["GET", "POST"]})).unwrap().await.unwrap();
    assert_eq!(next, json!({"methods": ["GET", "POST", "OPTIONS"]}));

    let patched = doc.patch("methods", json!(["GET", "POST"])).unwrap().await.unwrap();
    assert_eq!(patched.next, json!({"methods": ["GET", "POST", "OPTIONS"]}));
}

#[tokio::test]
async fn overwrite_rule_drops_prior_sibling_keys() {
    let doc = ConfigDocument::builder(entities_schema())
        .overwrite_rule(pattern("entities.*.fields.*.config"))
        .initial(json!({
            "entities": {
                "some": {"fields": {"a": {"type": "string", "config": {"some": "thing"}}}}
            }
        }))
        .build()
        .unwrap();

    doc.patch(
        "entities.some.fields.a",
        json!({"type": "string", "config": {"another": "one"}}),
    )
    .unwrap()
    .await
    .unwrap();

    assert_eq!(
        doc.get()["entities"]["some"]["fields"]["a"],
        json!({"type": "string", "config": {"another": "one"}})
    );
}
