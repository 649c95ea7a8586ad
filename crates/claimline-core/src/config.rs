use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_MESSAGE_LIMIT: usize = 50;
pub const DEFAULT_CALL_LOG_LIMIT: usize = 50;
pub const DEFAULT_USER_SEARCH_LIMIT: usize = 8;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 250;

/// Timeline configuration, loadable from a camelCase JSON file.
/// Every field has a default so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub message_limit: usize,
    pub call_log_limit: usize,
    pub user_search_limit: usize,
    pub search_debounce_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            message_limit: DEFAULT_MESSAGE_LIMIT,
            call_log_limit: DEFAULT_CALL_LOG_LIMIT,
            user_search_limit: DEFAULT_USER_SEARCH_LIMIT,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
        }
    }
}

impl CoreConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize config")
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config_minimal() {
        let config = CoreConfig::from_json("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.search_debounce(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_config_partial() {
        let json = r#"{"baseUrl": "https://crm.example.com/api", "apiToken": "tok", "userSearchLimit": 3}"#;
        let config = CoreConfig::from_json(json).unwrap();
        assert_eq!(config.base_url, "https://crm.example.com/api");
        assert_eq!(config.api_token.as_deref(), Some("tok"));
        assert_eq!(config.user_search_limit, 3);
        assert_eq!(config.message_limit, DEFAULT_MESSAGE_LIMIT);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"searchDebounceMs": 0}}"#).unwrap();
        let config = CoreConfig::load(file.path()).unwrap();
        assert!(config.search_debounce().is_zero());

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        let err = CoreConfig::load(bad.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
