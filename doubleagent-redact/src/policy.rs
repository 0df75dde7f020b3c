use regex::Regex;

/// Strategy applied to a redacted email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailStrategy {
    /// `user-N@doubleagent.local`, stable per distinct input value.
    #[default]
    Anonymize,
    /// Deterministic SHA-256-derived local part, no shared counter.
    Hash,
    /// Replace with an empty string.
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameStrategy {
    /// `User N`, stable per distinct input value.
    #[default]
    Anonymize,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AvatarStrategy {
    #[default]
    Placeholder,
    Remove,
}

/// Configurable redaction rules applied while pulling a snapshot, so real
/// PII is never written to disk.
#[derive(Debug, Clone)]
pub struct RedactionPolicy {
    pub email: EmailStrategy,
    pub name: NameStrategy,
    pub avatar_url: AvatarStrategy,
    /// `(pattern, replacement)` pairs applied, in order, to any string
    /// field that didn't match a built-in PII category.
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self {
            email: EmailStrategy::default(),
            name: NameStrategy::default(),
            avatar_url: AvatarStrategy::default(),
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_pattern(mut self, pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(pattern)?;
        self.custom_patterns.push((re, replacement.to_string()));
        Ok(self)
    }
}
