//! Executor configuration

use query_core::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Lifetime of first-level cache entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalCacheScope {
    /// Entries live until commit, rollback, close or an explicit clear
    #[default]
    Session,
    /// Entries are dropped when each outermost query completes
    Statement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub local_cache_scope: LocalCacheScope,
    /// Route statements through their namespace's second-level cache
    pub cache_enabled: bool,
    /// Appended to every cache key when set
    pub environment_id: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            local_cache_scope: LocalCacheScope::Session,
            cache_enabled: true,
            environment_id: None,
        }
    }
}

impl ExecutorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_local_cache_scope(mut self, scope: LocalCacheScope) -> Self {
        self.local_cache_scope = scope;
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_environment_id(mut self, id: impl Into<String>) -> Self {
        self.environment_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.local_cache_scope, LocalCacheScope::Session);
        assert!(config.cache_enabled);
        assert_eq!(config.environment_id, None);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("executor-config-{}.json", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"local_cache_scope": "statement", "environment_id": "development"}}"#
        )
        .unwrap();

        let config = ExecutorConfig::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.local_cache_scope, LocalCacheScope::Statement);
        assert!(config.cache_enabled);
        assert_eq!(config.environment_id.as_deref(), Some("development"));
    }

    #[test]
    fn test_from_missing_file() {
        let err = ExecutorConfig::from_file("/nonexistent/executor.json").unwrap_err();
        assert!(matches!(err, query_core::QueryError::IoError(_)));
    }
}
