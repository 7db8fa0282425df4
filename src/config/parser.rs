use std::path::Path;
use crate::errors::HarvesterError;
use super::types::HarvesterConfig;
use tracing::{debug, warn};

pub const API_URL_ENV: &str = "HARVESTER_API_URL";
pub const API_TOKEN_ENV: &str = "HARVESTER_API_TOKEN";

pub async fn parse_config(path: &Path) -> Result<HarvesterConfig, HarvesterError> {
    if !path.exists() {
        return Err(HarvesterError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(HarvesterError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: HarvesterConfig = if content.trim().is_empty() {
        HarvesterConfig::default()
    } else {
        serde_yaml::from_str(&content)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Load the config file if one was given, otherwise defaults, then apply
/// environment overrides.
pub async fn load_config(path: Option<&Path>) -> Result<HarvesterConfig, HarvesterError> {
    let mut config = match path {
        Some(p) => parse_config(p).await?,
        None => HarvesterConfig::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config)?;
    Ok(config)
}

pub fn apply_env_overrides<F>(config: &mut HarvesterConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url;
    }
    if let Some(token) = lookup(API_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
        config.api.token = Some(token);
    }
}

/// Reject configurations the client cannot work with.
pub fn validate_config(config: &HarvesterConfig) -> Result<(), HarvesterError> {
    let api = &config.api;
    if api.base_url.trim().is_empty() {
        return Err(HarvesterError::Config("api.base_url must not be empty".into()));
    }
    if !api.base_url.starts_with("http://") && !api.base_url.starts_with("https://") {
        return Err(HarvesterError::Config(format!(
            "api.base_url must be an http(s) URL: {}",
            api.base_url
        )));
    }
    if api.request_timeout_secs == 0 || api.batch_timeout_secs == 0 {
        return Err(HarvesterError::Config("API timeouts must be greater than 0".into()));
    }
    if api.batch_timeout_secs < api.request_timeout_secs {
        return Err(HarvesterError::Config(
            "api.batch_timeout_secs must not be shorter than api.request_timeout_secs".into(),
        ));
    }

    let paths = [
        ("batch_lookup", &api.paths.batch_lookup),
        ("identify", &api.paths.identify),
        ("providers", &api.paths.providers),
        ("refresh", &api.paths.refresh),
    ];
    for (name, path) in paths {
        if !path.starts_with('/') {
            return Err(HarvesterError::Config(format!("api.paths.{} must start with '/'", name)));
        }
    }

    if config.lookup.identify_debounce_ms > 10_000 {
        warn!(
            debounce_ms = config.lookup.identify_debounce_ms,
            "Identification debounce is unusually long"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&HarvesterConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_short_batch_timeout() {
        let mut config = HarvesterConfig::default();
        config.api.batch_timeout_secs = 5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_relative_path() {
        let mut config = HarvesterConfig::default();
        config.api.paths.identify = "api/identify".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = HarvesterConfig::default();
        config.api.base_url = "ftp://cti".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = HarvesterConfig::default();
        apply_env_overrides(&mut config, |name| match name {
            API_URL_ENV => Some("https://cti.internal".into()),
            API_TOKEN_ENV => Some("secret".into()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "https://cti.internal");
        assert_eq!(config.api.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = HarvesterConfig::default();
        apply_env_overrides(&mut config, |_| Some("  ".into()));
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert!(config.api.token.is_none());
    }

    #[tokio::test]
    async fn test_parse_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api:\n  base_url: https://cti.example.org\n  batch_timeout_secs: 90\nlookup:\n  auto_load: false").unwrap();
        let config = parse_config(file.path()).await.unwrap();
        assert_eq!(config.api.batch_timeout_secs, 90);
        assert!(!config.lookup.auto_load);
    }

    #[tokio::test]
    async fn test_parse_missing_file() {
        let result = parse_config(Path::new("/nonexistent/harvester.yaml")).await;
        assert!(matches!(result, Err(HarvesterError::Config(_))));
    }
}
