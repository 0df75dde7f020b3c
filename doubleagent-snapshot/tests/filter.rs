use std::collections::HashMap;

use doubleagent_snapshot::{apply_relational_filter, FollowRule, SeedStreamConfig, SeedingConfig};
use serde_json::json;

fn resource(v: serde_json::Value) -> doubleagent_core::Resource {
    v.as_object().unwrap().clone()
}

/// S5 from the testable-properties scenarios: 3 repos with issues each,
/// `default_limit: 2` and `limit_per_parent: 1` on the follow rule should
/// leave exactly 2 repos and 2 issues (one per selected parent) selected.
#[test]
fn s5_relational_filter_scenario() {
    let mut resources = HashMap::new();
    resources.insert(
        "repos".to_string(),
        vec![
            resource(json!({"id": "acme/r1"})),
            resource(json!({"id": "acme/r2"})),
            resource(json!({"id": "acme/r3"})),
        ],
    );
    resources.insert(
        "issues".to_string(),
        vec![
            resource(json!({"id": "i1", "repo_id": "acme/r1"})),
            resource(json!({"id": "i2", "repo_id": "acme/r1"})),
            resource(json!({"id": "i3", "repo_id": "acme/r2"})),
            resource(json!({"id": "i4", "repo_id": "acme/r3"})),
        ],
    );

    let config = SeedingConfig {
        default_limit: Some(2),
        seed_streams: vec![SeedStreamConfig {
            stream: "repos".to_string(),
            limit: None,
            follow: vec![FollowRule {
                child_stream: "issues".to_string(),
                foreign_key: "repo_id".to_string(),
                parent_key: "id".to_string(),
                limit_per_parent: Some(1),
            }],
        }],
    };

    let result = apply_relational_filter(&resources, &config);

    assert_eq!(result["repos"].len(), 2);
    assert_eq!(result["issues"].len(), 2);

    let selected_repo_ids: std::collections::HashSet<_> =
        result["repos"].iter().map(|r| r["id"].as_str().unwrap().to_string()).collect();
    for issue in &result["issues"] {
        let repo_id = issue["repo_id"].as_str().unwrap();
        assert!(selected_repo_ids.contains(repo_id), "{repo_id} must be among the selected repos");
    }
}
