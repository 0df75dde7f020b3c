use std::collections::HashMap;
use std::sync::OnceLock;

use doubleagent_core::Resource;
use regex::Regex;
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::policy::{AvatarStrategy, EmailStrategy, NameStrategy, RedactionPolicy};

const PLACEHOLDER_AVATAR: &str = "https://doubleagent.local/avatar/placeholder.png";

const EMAIL_FIELDS: &[&str] = &[
    "email",
    "user_email",
    "author_email",
    "committer_email",
    "notification_email",
];
const NAME_FIELDS: &[&str] = &[
    "name",
    "real_name",
    "display_name",
    "full_name",
    "author_name",
    "committer_name",
];
const AVATAR_FIELDS: &[&str] = &["avatar_url", "image_url", "icon_url", "profile_image"];
const PHONE_FIELDS: &[&str] = &["phone", "phone_number", "mobile"];
const SECRET_KEYWORDS: &[&str] = &["token", "secret", "password", "apikey", "api_key"];

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

/// Applies a [`RedactionPolicy`] to resource maps, deterministically:
/// the same input value always maps to the same output within one
/// redactor's lifetime, preserving referential integrity (e.g. the same
/// author email redacts to the same `user-N@doubleagent.local` on every
/// resource it appears on).
pub struct PiiRedactor {
    policy: RedactionPolicy,
    email_counter: HashMap<String, u64>,
    name_counter: HashMap<String, u64>,
    next_user_id: u64,
}

impl PiiRedactor {
    pub fn new(policy: RedactionPolicy) -> Self {
        Self {
            policy,
            email_counter: HashMap::new(),
            name_counter: HashMap::new(),
            next_user_id: 0,
        }
    }

    pub fn redact_resources(&mut self, resources: &mut [Resource]) {
        for resource in resources.iter_mut() {
            for (key, value) in resource.iter_mut() {
                self.redact_value(&key.to_lowercase(), value);
            }
        }
    }

    fn redact_value(&mut self, field_name: &str, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, v) in map.iter_mut() {
                    self.redact_value(&key.to_lowercase(), v);
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.redact_value(field_name, item);
                }
            }
            Value::String(s) => {
                *s = self.redact_field(field_name, s);
            }
            _ => {}
        }
    }

    fn redact_field(&mut self, field_name: &str, value: &str) -> String {
        if EMAIL_FIELDS.contains(&field_name) || email_re().is_match(value) {
            return match self.policy.email {
                EmailStrategy::Remove => String::new(),
                EmailStrategy::Hash => hash_email(value),
                EmailStrategy::Anonymize => self.anonymize_email(value),
            };
        }

        if NAME_FIELDS.contains(&field_name) {
            return match self.policy.name {
                NameStrategy::Remove => String::new(),
                NameStrategy::Anonymize => self.anonymize_name(value),
            };
        }

        if AVATAR_FIELDS.contains(&field_name) {
            return match self.policy.avatar_url {
                AvatarStrategy::Remove => String::new(),
                AvatarStrategy::Placeholder => PLACEHOLDER_AVATAR.to_string(),
            };
        }

        if PHONE_FIELDS.contains(&field_name) {
            return String::new();
        }

        let lower = value.to_lowercase();
        if SECRET_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return format!("redacted-{}", stable_suffix(value));
        }

        let mut out = value.to_string();
        for (pattern, replacement) in &self.policy.custom_patterns {
            out = pattern.replace_all(&out, replacement.as_str()).into_owned();
        }
        out
    }

    fn anonymize_email(&mut self, email: &str) -> String {
        let uid = *self.email_counter.entry(email.to_string()).or_insert_with(|| {
            self.next_user_id += 1;
            self.next_user_id
        });
        format!("user-{uid}@doubleagent.local")
    }

    fn anonymize_name(&mut self, name: &str) -> String {
        if name.trim().is_empty() {
            return name.to_string();
        }
        let uid = *self.name_counter.entry(name.to_string()).or_insert_with(|| {
            self.next_user_id += 1;
            self.next_user_id
        });
        format!("User {uid}")
    }
}

fn hash_email(email: &str) -> String {
    format!("{}@doubleagent.local", stable_suffix(email))
}

fn stable_suffix(value: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())[..10].to_string()
}
