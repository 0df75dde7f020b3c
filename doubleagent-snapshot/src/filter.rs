use std::collections::{HashMap, HashSet, VecDeque};

use doubleagent_core::Resource;
use serde::{Deserialize, Serialize};

/// One parent -> child edge a [`apply_relational_filter`] walk can follow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowRule {
    pub child_stream: String,
    pub foreign_key: String,
    #[serde(default = "default_parent_key")]
    pub parent_key: String,
    #[serde(default)]
    pub limit_per_parent: Option<usize>,
}

fn default_parent_key() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedStreamConfig {
    pub stream: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub follow: Vec<FollowRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedingConfig {
    #[serde(default)]
    pub seed_streams: Vec<SeedStreamConfig>,
    #[serde(default)]
    pub default_limit: Option<usize>,
}

impl SeedingConfig {
    /// Every stream named as either a root seed or a follow target.
    pub fn all_stream_names(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for cfg in &self.seed_streams {
            names.insert(cfg.stream.clone());
            for rule in &cfg.follow {
                names.insert(rule.child_stream.clone());
            }
        }
        names
    }
}

fn collect_keys(records: &[Resource], key: &str) -> HashSet<String> {
    records
        .iter()
        .filter_map(|r| r.get(key))
        .map(value_as_key)
        .collect()
}

fn value_as_key(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn filter_children(
    records: &[Resource],
    foreign_key: &str,
    allowed_parent_ids: &HashSet<String>,
    limit_per_parent: Option<usize>,
) -> Vec<Resource> {
    let Some(limit) = limit_per_parent else {
        return records
            .iter()
            .filter(|r| {
                r.get(foreign_key)
                    .map(|v| allowed_parent_ids.contains(&value_as_key(v)))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
    };

    let mut per_parent_count: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::new();
    for row in records {
        let parent_id = row.get(foreign_key).map(value_as_key).unwrap_or_default();
        if !allowed_parent_ids.contains(&parent_id) {
            continue;
        }
        let count = per_parent_count.entry(parent_id).or_insert(0);
        if *count >= limit {
            continue;
        }
        *count += 1;
        result.push(row.clone());
    }
    result
}

struct QueueItem {
    stream: String,
    parent_ids: Option<HashSet<String>>,
    rule: Option<FollowRule>,
}

/// Breadth-first selection over `resources`, following [`SeedStreamConfig`]
/// `follow` rules to narrow child streams to records that actually belong
/// to the selected parents.
///
/// Preserves two deliberate quirks of the reference implementation (see
/// the spec's Design Notes): `visited_edges` means a child stream reached
/// via two different parent edges is only populated from whichever parent
/// is processed first, and within one output stream the first record
/// written under a given id wins (insertion-order, not last-write).
pub fn apply_relational_filter(
    resources: &HashMap<String, Vec<Resource>>,
    config: &SeedingConfig,
) -> HashMap<String, Vec<Resource>> {
    let stream_cfg: HashMap<&str, &SeedStreamConfig> =
        config.seed_streams.iter().map(|s| (s.stream.as_str(), s)).collect();

    // Insertion-ordered per-stream dedup map, keyed by record id (falling
    // back to position in the stream's output when no id is present).
    let mut output: HashMap<String, Vec<(String, Resource)>> = HashMap::new();
    let mut visited_edges: HashSet<(String, String)> = HashSet::new();

    let mut queue: VecDeque<QueueItem> = VecDeque::new();
    for root in &config.seed_streams {
        queue.push_back(QueueItem {
            stream: root.stream.clone(),
            parent_ids: None,
            rule: None,
        });
    }

    while let Some(item) = queue.pop_front() {
        let empty = Vec::new();
        let rows = resources.get(&item.stream).unwrap_or(&empty);

        let selected = match (&item.parent_ids, &item.rule) {
            (Some(parent_ids), Some(rule)) => {
                filter_children(rows, &rule.foreign_key, parent_ids, rule.limit_per_parent)
            }
            _ => {
                let limit = stream_cfg
                    .get(item.stream.as_str())
                    .and_then(|c| c.limit)
                    .or(config.default_limit);
                match limit {
                    Some(limit) => rows.iter().take(limit).cloned().collect(),
                    None => rows.clone(),
                }
            }
        };

        let entry = output.entry(item.stream.clone()).or_default();
        let seen: HashSet<&String> = entry.iter().map(|(id, _)| id).collect();
        let mut next_idx = entry.len();
        let mut fresh = Vec::new();
        for row in &selected {
            let id = doubleagent_core::resource::resource_id(row).unwrap_or_else(|| {
                let idx = next_idx;
                next_idx += 1;
                format!("idx-{idx}")
            });
            if !seen.contains(&id) && !fresh.iter().any(|(k, _): &(String, Resource)| k == &id) {
                fresh.push((id, row.clone()));
            }
        }
        entry.extend(fresh);

        let Some(cfg) = stream_cfg.get(item.stream.as_str()) else {
            continue;
        };
        for rule in &cfg.follow {
            let edge = (item.stream.clone(), rule.child_stream.clone());
            if visited_edges.contains(&edge) {
                continue;
            }
            visited_edges.insert(edge);

            if resources.get(&rule.child_stream).map(|v| v.is_empty()).unwrap_or(true) {
                continue;
            }

            let ids = collect_keys(&selected, &rule.parent_key);
            if !ids.is_empty() {
                queue.push_back(QueueItem {
                    stream: rule.child_stream.clone(),
                    parent_ids: Some(ids),
                    rule: Some(rule.clone()),
                });
            }
        }
    }

    output
        .into_iter()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(stream, rows)| (stream, rows.into_iter().map(|(_, r)| r).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(v: serde_json::Value) -> Resource {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn root_limit_and_follow_with_limit_per_parent() {
        let mut resources = HashMap::new();
        resources.insert(
            "repos".to_string(),
            vec![
                resource(json!({"id": "r1"})),
                resource(json!({"id": "r2"})),
                resource(json!({"id": "r3"})),
            ],
        );
        resources.insert(
            "issues".to_string(),
            vec![
                resource(json!({"id": "i1", "repo_id": "r1"})),
                resource(json!({"id": "i2", "repo_id": "r1"})),
                resource(json!({"id": "i3", "repo_id": "r2"})),
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
    }

    #[test]
    fn empty_streams_are_dropped_from_output() {
        let mut resources = HashMap::new();
        resources.insert("repos".to_string(), vec![resource(json!({"id": "r1"}))]);

        let config = SeedingConfig {
            default_limit: None,
            seed_streams: vec![SeedStreamConfig {
                stream: "repos".to_string(),
                limit: None,
                follow: vec![FollowRule {
                    child_stream: "issues".to_string(),
                    foreign_key: "repo_id".to_string(),
                    parent_key: "id".to_string(),
                    limit_per_parent: None,
                }],
            }],
        };

        let result = apply_relational_filter(&resources, &config);
        assert!(!result.contains_key("issues"));
    }

    #[test]
    fn second_follow_rule_to_an_already_visited_child_is_skipped() {
        // Two distinct paths from the same parent stream into the same
        // child stream share one (parent, child) edge key, so only the
        // first-listed rule's selection survives — the documented
        // single-path-wins quirk, not a bug to "fix" silently.
        let mut resources = HashMap::new();
        resources.insert("repos".to_string(), vec![resource(json!({"id": "r1"}))]);
        resources.insert(
            "issues".to_string(),
            vec![
                resource(json!({"id": "i1", "repo_id": "r1"})),
                resource(json!({"id": "i2", "owner_id": "r1"})),
            ],
        );

        let config = SeedingConfig {
            default_limit: None,
            seed_streams: vec![SeedStreamConfig {
                stream: "repos".to_string(),
                limit: None,
                follow: vec![
                    FollowRule {
                        child_stream: "issues".to_string(),
                        foreign_key: "repo_id".to_string(),
                        parent_key: "id".to_string(),
                        limit_per_parent: None,
                    },
                    FollowRule {
                        child_stream: "issues".to_string(),
                        foreign_key: "owner_id".to_string(),
                        parent_key: "id".to_string(),
                        limit_per_parent: None,
                    },
                ],
            }],
        };

        let result = apply_relational_filter(&resources, &config);
        assert_eq!(result["issues"].len(), 1);
        assert_eq!(result["issues"][0]["id"], json!("i1"));
    }
}
