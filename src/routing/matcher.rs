//! Path prefix matching.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match whole segments: `/api` matches `/api` and `/api/x`, not `/apix`
//! - No regex to guarantee O(n) matching

/// Segment-aware path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix {
    prefix: String,
}

impl PathPrefix {
    /// Trailing slashes are ignored (`/api/` behaves as `/api`); `/` matches everything.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: trimmed.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// Number of significant characters, used to rank competing matches.
    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// The remainder of `path` after the prefix, always starting with '/'.
    /// Callers must check `matches` first.
    pub fn strip<'p>(&self, path: &'p str) -> &'p str {
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") | None => "/",
            Some(rest) => rest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_aware_matching() {
        let prefix = PathPrefix::new("/gateway/m1");
        assert!(prefix.matches("/gateway/m1"));
        assert!(prefix.matches("/gateway/m1/items/7"));
        assert!(!prefix.matches("/gateway/m10/items"));
        assert!(!prefix.matches("/gateway"));
        assert!(!prefix.matches("/Gateway/m1"));
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let prefix = PathPrefix::new("/api/");
        assert_eq!(prefix.as_str(), "/api");
        assert!(prefix.matches("/api/v1"));
    }

    #[test]
    fn test_root_matches_everything() {
        let prefix = PathPrefix::new("/");
        assert!(prefix.matches("/anything/at/all"));
        assert_eq!(prefix.strip("/anything"), "/anything");
        assert_eq!(prefix.len(), 0);
    }

    #[test]
    fn test_strip() {
        let prefix = PathPrefix::new("/gateway/m1");
        assert_eq!(prefix.strip("/gateway/m1/items/7"), "/items/7");
        assert_eq!(prefix.strip("/gateway/m1"), "/");
    }
}
