//! Configuration options for a navigator.
//!
//! `NavigatorConfig` bounds how much a single remote call may return and how
//! far an upward path walk may go before giving up.

use serde::{Deserialize, Serialize};

/// Configuration options for a `Navigator` and the nodes it materializes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Maximum number of children returned by one discovery call.
    ///
    /// There is no continuation: containers with more children than this
    /// expose only the first page.
    pub page_size: usize,

    /// Maximum number of candidates requested from a remote search.
    pub search_limit: usize,

    /// Maximum number of ancestors fetched while reconstructing a path.
    pub max_depth: usize,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            search_limit: 50,
            max_depth: 64,
        }
    }
}

impl NavigatorConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the discovery page size (at least 1).
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the remote search candidate limit (at least 1).
    pub fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    /// Set the upward walk depth bound.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NavigatorConfig::default();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.search_limit, 50);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_builder_pattern() {
        let config = NavigatorConfig::new()
            .page_size(10)
            .search_limit(0)
            .max_depth(3);

        assert_eq!(config.page_size, 10);
        assert_eq!(config.search_limit, 1);
        assert_eq!(config.max_depth, 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NavigatorConfig = serde_json::from_str(r#"{ "page_size": 5 }"#).unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.search_limit, 50);
        assert_eq!(config.max_depth, 64);
    }
}
