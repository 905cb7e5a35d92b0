use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a workspace explorer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Quiet window after the last watch notification before a
    /// reconciliation runs.
    pub debounce_ms: u64,
    /// Delay between a successful mutation and the deferred consistency
    /// reconciliation.
    pub reconcile_delay_ms: u64,
    /// Entry names filtered out of every directory listing.
    pub hidden_names: Vec<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            reconcile_delay_ms: 500,
            hidden_names: vec![".git".to_string()],
        }
    }
}

impl ExplorerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExplorerConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.reconcile_delay(), Duration::from_millis(500));
        assert_eq!(config.hidden_names, [".git"]);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: ExplorerConfig = serde_json::from_str(r#"{"debounce_ms": 50}"#).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(config.reconcile_delay(), Duration::from_millis(500));
        assert_eq!(config.hidden_names, [".git"]);
    }
}
