//! Runtime configuration. All collaborator endpoints and credentials come
//! from the environment; there is no configuration file. A missing credential
//! degrades the affected collaborator, it never stops the process from
//! starting.

use std::env;
use tracing::debug;

const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com";
const DEFAULT_IFIND_BASE_URL: &str = "https://ft.10jqka.com.cn";
const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub notion_base_url: String,
    pub notion_api_key: Option<String>,
    pub notion_database_id: Option<String>,
    pub ifind_base_url: String,
    pub ifind_refresh_token: Option<String>,
    pub yahoo_base_url: String,
    pub alert_webhook_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|key| env::var(key).ok());
        debug!(
            store = config.notion_api_key.is_some() && config.notion_database_id.is_some(),
            ifind = config.ifind_refresh_token.is_some(),
            alerts = config.alert_webhook_url.is_some(),
            "collaborator credentials present"
        );
        config
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        AppConfig {
            notion_base_url: var("NOTION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_NOTION_BASE_URL.to_string()),
            notion_api_key: var("NOTION_API_KEY"),
            notion_database_id: var("NOTION_DATABASE_ID"),
            ifind_base_url: var("IFIND_BASE_URL")
                .unwrap_or_else(|| DEFAULT_IFIND_BASE_URL.to_string()),
            ifind_refresh_token: var("IFIND_REFRESH_TOKEN"),
            yahoo_base_url: var("YAHOO_BASE_URL")
                .unwrap_or_else(|| DEFAULT_YAHOO_BASE_URL.to_string()),
            alert_webhook_url: var("ALERT_WEBHOOK_URL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(entries: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.notion_base_url, DEFAULT_NOTION_BASE_URL);
        assert_eq!(config.ifind_base_url, DEFAULT_IFIND_BASE_URL);
        assert_eq!(config.yahoo_base_url, DEFAULT_YAHOO_BASE_URL);
        assert!(config.notion_api_key.is_none());
        assert!(config.ifind_refresh_token.is_none());
        assert!(config.alert_webhook_url.is_none());
    }

    #[test]
    fn test_overrides_and_credentials() {
        let config = AppConfig::from_lookup(lookup(&[
            ("NOTION_BASE_URL", "http://localhost:9999"),
            ("NOTION_API_KEY", "key"),
            ("NOTION_DATABASE_ID", "db"),
            ("IFIND_REFRESH_TOKEN", "refresh"),
            ("ALERT_WEBHOOK_URL", "http://localhost:9998/alerts"),
        ]));
        assert_eq!(config.notion_base_url, "http://localhost:9999");
        assert_eq!(config.notion_api_key.as_deref(), Some("key"));
        assert_eq!(config.notion_database_id.as_deref(), Some("db"));
        assert_eq!(config.ifind_refresh_token.as_deref(), Some("refresh"));
        assert_eq!(
            config.alert_webhook_url.as_deref(),
            Some("http://localhost:9998/alerts")
        );
    }

    #[test]
    fn test_blank_values_count_as_absent() {
        let config = AppConfig::from_lookup(lookup(&[("NOTION_API_KEY", "   ")]));
        assert!(config.notion_api_key.is_none());
    }
}
