//! Root defaults for inheritable branch options.

use serde::{Deserialize, Serialize};

/// Values a root branch starts from for options its nodes inherit.
///
/// A root branch's own options take precedence, and every nested node
/// inherits whatever it leaves unset from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Raise when data runs out before the last node.
    #[serde(default)]
    pub all_operations_must_be_executed: bool,
    /// Hide argument summaries from the logs.
    #[serde(default)]
    pub hide_logging: bool,
    /// Check every container item instead of only the first.
    #[serde(default = "default_check_all")]
    pub check_type_strategy_all: bool,
}

fn default_check_all() -> bool {
    true
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            all_operations_must_be_executed: false,
            hide_logging: false,
            check_type_strategy_all: true,
        }
    }
}

impl ExecutorConfig {
    /// Sets `all_operations_must_be_executed`.
    #[must_use]
    pub fn with_all_operations_must_be_executed(mut self, value: bool) -> Self {
        self.all_operations_must_be_executed = value;
        self
    }

    /// Sets `hide_logging`.
    #[must_use]
    pub fn with_hide_logging(mut self, value: bool) -> Self {
        self.hide_logging = value;
        self
    }

    /// Sets `check_type_strategy_all`.
    #[must_use]
    pub fn with_check_type_strategy_all(mut self, value: bool) -> Self {
        self.check_type_strategy_all = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert!(!config.all_operations_must_be_executed);
        assert!(!config.hide_logging);
        assert!(config.check_type_strategy_all);
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let config: ExecutorConfig =
            serde_json::from_str(r#"{"hide_logging": true}"#).expect("valid config");
        assert_eq!(config, ExecutorConfig::default().with_hide_logging(true));
    }
}
