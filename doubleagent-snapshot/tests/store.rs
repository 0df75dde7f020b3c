use std::collections::HashMap;

use doubleagent_snapshot::SnapshotStore;
use serde_json::json;

fn resource(v: serde_json::Value) -> doubleagent_core::Resource {
    v.as_object().unwrap().clone()
}

/// S6 from the testable-properties scenarios: saving `{1: old, 2: keep}`
/// then incrementally saving `{1: new, 3: add}` must yield
/// `{1: old, 2: keep, 3: add}` — id 1 preserved, not overwritten.
#[test]
fn s6_snapshot_incremental_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());

    let mut first = HashMap::new();
    first.insert(
        "repos".to_string(),
        vec![resource(json!({"id": 1, "name": "old"})), resource(json!({"id": 2, "name": "keep"}))],
    );
    store.save("github", "ci", &first, "demo-connector", true).unwrap();

    let mut second = HashMap::new();
    second.insert(
        "repos".to_string(),
        vec![resource(json!({"id": 1, "name": "new"})), resource(json!({"id": 3, "name": "add"}))],
    );
    store.save_incremental("github", "ci", &second, "demo-connector", true).unwrap();

    let (manifest, baseline) = store.load("github", "ci").unwrap();
    assert_eq!(manifest.resource_counts["repos"], 3);
    assert_eq!(baseline["repos"]["1"]["name"], json!("old"));
    assert_eq!(baseline["repos"]["2"]["name"], json!("keep"));
    assert_eq!(baseline["repos"]["3"]["name"], json!("add"));
}
