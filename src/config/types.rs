use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HarvesterConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token sent with every request, if the backend wants one.
    pub token: Option<String>,
    pub request_timeout_secs: u64,
    pub batch_timeout_secs: u64,
    pub paths: ApiPaths,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token: None,
            request_timeout_secs: 10,
            batch_timeout_secs: 60,
            paths: ApiPaths::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiPaths {
    pub batch_lookup: String,
    pub identify: String,
    pub providers: String,
    pub refresh: String,
}

impl Default for ApiPaths {
    fn default() -> Self {
        Self {
            batch_lookup: "/api/lookup/batch".to_string(),
            identify: "/api/indicators/identify".to_string(),
            providers: "/api/lookup/providers".to_string(),
            refresh: "/api/auth/refresh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: "./data/harvester.db".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Initial auto-load mode when nothing has been persisted yet.
    pub auto_load: bool,
    pub identify_debounce_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            auto_load: true,
            identify_debounce_ms: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvester_config_default() {
        let config = HarvesterConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert!(config.api.token.is_none());
        assert!(config.lookup.auto_load);
    }

    #[test]
    fn test_batch_timeout_longer_than_request_timeout() {
        let api = ApiConfig::default();
        assert!(api.batch_timeout_secs > api.request_timeout_secs);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: HarvesterConfig = serde_yaml::from_str("api:\n  base_url: https://cti.example.org\n").unwrap();
        assert_eq!(config.api.base_url, "https://cti.example.org");
        assert_eq!(config.api.request_timeout_secs, 10);
        assert_eq!(config.api.paths.identify, "/api/indicators/identify");
        assert_eq!(config.storage.path, "./data/harvester.db");
    }

    #[test]
    fn test_default_paths() {
        let paths = ApiPaths::default();
        assert_eq!(paths.batch_lookup, "/api/lookup/batch");
        assert_eq!(paths.refresh, "/api/auth/refresh");
    }
}
