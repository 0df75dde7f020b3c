use serde_json::{Map, Value};

/// A vendor-agnostic resource type tag, e.g. `"repos"`, `"issues"`, `"users"`.
pub type ResourceType = String;

/// A resource's stable identifier, either client-supplied or allocated by the overlay.
pub type ResourceId = String;

/// An opaque record: field name -> JSON-compatible value.
///
/// `serde_json::Map<String, Value>` already is the tagged variant tree
/// (`Null | Bool | Number | String | Array | Object`) the data model calls
/// for, with `Clone` giving deep-copy-on-read for free.
pub type Resource = Map<String, Value>;

/// Read `id` off a resource as a string, the way every vendor router needs to.
pub fn resource_id(resource: &Resource) -> Option<ResourceId> {
    match resource.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_id_reads_string_and_number() {
        let r: Resource = json!({"id": "acme/r", "name": "r"}).as_object().unwrap().clone();
        assert_eq!(resource_id(&r), Some("acme/r".to_string()));

        let r: Resource = json!({"id": 42}).as_object().unwrap().clone();
        assert_eq!(resource_id(&r), Some("42".to_string()));
    }

    #[test]
    fn resource_id_missing_is_none() {
        let r: Resource = json!({"name": "no id here"}).as_object().unwrap().clone();
        assert_eq!(resource_id(&r), None);
    }
}
