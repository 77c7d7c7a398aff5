//! Topic matching utilities

/// Topic matcher for wildcard pattern matching
///
/// Patterns are exact topics (`connection.accepted`), prefix wildcards
/// (`connection.*`), suffix wildcards (`*.created`) or a bare `*`.
#[derive(Debug, Clone, Default)]
pub struct TopicMatcher {
    patterns: Vec<String>,
}

impl TopicMatcher {
    /// Create a new topic matcher with the given patterns
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Matcher accepting every topic
    pub fn all() -> Self {
        Self::new(vec!["*".to_string()])
    }

    /// Check if a topic matches any of the patterns
    pub fn matches(&self, topic: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| Self::match_pattern(pattern, topic))
    }

    fn match_pattern(pattern: &str, topic: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            return topic.starts_with(prefix);
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            return topic.ends_with(suffix);
        }
        pattern == topic
    }

    /// Add a new pattern to the matcher
    pub fn add_pattern<S: Into<String>>(&mut self, pattern: S) {
        self.patterns.push(pattern.into());
    }

    /// Get all patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check if the matcher is empty
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl From<Vec<String>> for TopicMatcher {
    fn from(patterns: Vec<String>) -> Self {
        Self::new(patterns)
    }
}

impl From<Vec<&str>> for TopicMatcher {
    fn from(patterns: Vec<&str>) -> Self {
        Self::new(patterns.into_iter().map(|s| s.to_string()).collect())
    }
}

impl From<&[String]> for TopicMatcher {
    fn from(patterns: &[String]) -> Self {
        Self::new(patterns.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let matcher = TopicMatcher::from(vec!["post.created"]);
        assert!(matcher.matches("post.created"));
        assert!(!matcher.matches("post.deleted"));
    }

    #[test]
    fn test_prefix_wildcard() {
        let matcher = TopicMatcher::from(vec!["connection.*"]);
        assert!(matcher.matches("connection.requested"));
        assert!(matcher.matches("connection.accepted"));
        assert!(!matcher.matches("post.created"));
    }

    #[test]
    fn test_suffix_wildcard() {
        let matcher = TopicMatcher::from(vec!["*.created"]);
        assert!(matcher.matches("post.created"));
        assert!(!matcher.matches("connection.accepted"));
    }

    #[test]
    fn test_catch_all_and_empty() {
        assert!(TopicMatcher::all().matches("anything"));

        let mut matcher = TopicMatcher::default();
        assert!(matcher.is_empty());
        assert!(!matcher.matches("post.created"));

        matcher.add_pattern("post.created");
        assert_eq!(matcher.patterns(), &["post.created".to_string()]);
        assert!(matcher.matches("post.created"));
    }
}
