use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Serializes `value` the way the signing body must be built: compact
/// separators, object keys sorted, so two equal JSON values always
/// produce byte-identical bytes regardless of field insertion order.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("string keys always serialize"));
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// `sha256=<hex>` over the canonical JSON body, or `None` if no secret
/// was configured for this target.
pub fn compute_signature(payload: &Value, secret: Option<&str>) -> Option<String> {
    let secret = secret?;
    let body = canonical_json(payload);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body.as_bytes());
    let digest = mac.finalize().into_bytes();
    Some(format!("sha256={}", hex::encode(digest)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys_and_is_compact() {
        let value = json!({"b": 1, "a": [1, 2], "c": {"y": 2, "x": 1}});
        assert_eq!(canonical_json(&value), r#"{"a":[1,2],"b":1,"c":{"x":1,"y":2}}"#);
    }

    #[test]
    fn no_secret_means_no_signature() {
        assert_eq!(compute_signature(&json!({"a": 1}), None), None);
    }

    #[test]
    fn signature_is_deterministic_and_key_order_independent() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert_eq!(
            compute_signature(&a, Some("secret")),
            compute_signature(&b, Some("secret"))
        );
        assert!(compute_signature(&a, Some("secret"))
            .unwrap()
            .starts_with("sha256="));
    }
}
