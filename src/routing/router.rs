//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled route rules
//! - Find the longest matching prefix for a path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Rules sorted longest-prefix-first at build time; first hit wins
//! - O(n) prefix scan (acceptable for typical route counts)

use crate::config::RouteConfig;
use crate::routing::matcher::PathPrefix;

/// A compiled gateway rule: path prefix → logical service.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub prefix: PathPrefix,
    pub target_logical_name: String,
    pub strip_prefix: bool,
}

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// Logical service to forward to.
    pub service: &'a str,
    /// The path to send downstream.
    pub forward_path: String,
}

/// Immutable longest-prefix route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn from_config(routes: &[RouteConfig]) -> Self {
        let mut rules: Vec<RouteRule> = routes
            .iter()
            .map(|r| RouteRule {
                prefix: PathPrefix::new(r.prefix.as_str()),
                target_logical_name: r.service.clone(),
                strip_prefix: r.strip_prefix,
            })
            .collect();
        rules.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        for rule in &rules {
            tracing::info!(
                prefix = %rule.prefix.as_str(),
                service = %rule.target_logical_name,
                strip_prefix = rule.strip_prefix,
                "Route compiled"
            );
        }
        Self { rules }
    }

    /// Match `path` (without query) against the longest prefix.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let rule = self.rules.iter().find(|rule| rule.prefix.matches(path))?;
        let forward_path = if rule.strip_prefix {
            rule.prefix.strip(path).to_string()
        } else {
            path.to_string()
        };
        Some(RouteMatch {
            service: &rule.target_logical_name,
            forward_path,
        })
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(prefix: &str, service: &str, strip_prefix: bool) -> RouteConfig {
        RouteConfig {
            prefix: prefix.into(),
            service: service.into(),
            strip_prefix,
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RouteTable::from_config(&[
            route("/gateway", "fallback-service", false),
            route("/gateway/m1", "m1-service", true),
            route("/gateway/m1/special", "special-service", true),
        ]);

        let m = table.match_path("/gateway/m1/items/7").unwrap();
        assert_eq!(m.service, "m1-service");
        assert_eq!(m.forward_path, "/items/7");

        let m = table.match_path("/gateway/m1/special/x").unwrap();
        assert_eq!(m.service, "special-service");
        assert_eq!(m.forward_path, "/x");

        let m = table.match_path("/gateway/m2/items").unwrap();
        assert_eq!(m.service, "fallback-service");
        assert_eq!(m.forward_path, "/gateway/m2/items");
    }

    #[test]
    fn test_no_match() {
        let table = RouteTable::from_config(&[route("/gateway/m1", "m1-service", true)]);
        assert!(table.match_path("/other").is_none());
        assert!(table.match_path("/gateway/m1x").is_none());
    }

    #[test]
    fn test_many_rules_one_target() {
        let table = RouteTable::from_config(&[
            route("/a", "m3-service", true),
            route("/b", "m3-service", true),
        ]);
        assert_eq!(table.match_path("/a/1").unwrap().service, "m3-service");
        assert_eq!(table.match_path("/b/1").unwrap().service, "m3-service");
    }
}
