//! Run configuration for the checkers.
//!
//! A `timeout_secs` of zero means the run has no deadline.

use serde::{Deserialize, Serialize};

/// Order in which frontier nodes are expanded. Every strategy is
/// deterministic; ties are broken by creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Oldest node first.
    #[default]
    Bfs,
    /// Newest node first.
    Dfs,
    /// Node whose location is closest to the error location first.
    ErrorDistance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgConfig {
    pub search: SearchStrategy,
    /// Stop with `Unknown` once the graph holds this many nodes.
    pub max_nodes: Option<usize>,
    pub timeout_secs: u64,
}

impl Default for ArgConfig {
    fn default() -> Self {
        Self {
            search: SearchStrategy::Bfs,
            max_nodes: None,
            timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindConfig {
    /// Windows `0..bound` are tried before giving up.
    pub bound: usize,
    /// Require the states of the inductive window to be pairwise distinct.
    pub simple_path: bool,
    /// Run the inductive step; without it the checker is plain BMC.
    pub induction: bool,
    pub timeout_secs: u64,
}

impl Default for KindConfig {
    fn default() -> Self {
        Self {
            bound: 10,
            simple_path: false,
            induction: true,
            timeout_secs: 0,
        }
    }
}

impl KindConfig {
    pub fn builder() -> KindConfigBuilder {
        KindConfigBuilder::new()
    }
}

/// Builder for KindConfig
#[derive(Debug, Default)]
pub struct KindConfigBuilder {
    bound: Option<usize>,
    simple_path: Option<bool>,
    induction: Option<bool>,
    timeout_secs: Option<u64>,
}

impl KindConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound(mut self, value: usize) -> Self {
        self.bound = Some(value);
        self
    }

    pub fn simple_path(mut self, value: bool) -> Self {
        self.simple_path = Some(value);
        self
    }

    pub fn induction(mut self, value: bool) -> Self {
        self.induction = Some(value);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> KindConfig {
        let defaults = KindConfig::default();
        KindConfig {
            bound: self.bound.unwrap_or(defaults.bound),
            simple_path: self.simple_path.unwrap_or(defaults.simple_path),
            induction: self.induction.unwrap_or(defaults.induction),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplConfig {
    /// Initial states enumerated with the solver before falling back to top.
    pub max_init_enum: usize,
}

impl Default for ExplConfig {
    fn default() -> Self {
        Self { max_init_enum: 16 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_only_what_is_set() {
        let config = KindConfig::builder().bound(3).simple_path(true).build();
        assert_eq!(config.bound, 3);
        assert!(config.simple_path);
        assert!(config.induction);
        assert_eq!(config.timeout_secs, 0);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ArgConfig =
            serde_json::from_str(r#"{"search": "error_distance"}"#).expect("valid json");
        assert_eq!(config.search, SearchStrategy::ErrorDistance);
        assert_eq!(config.max_nodes, None);
    }
}
