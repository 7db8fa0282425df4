use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use crate::client::{ApiClient, SessionExpiredHandler};
use crate::config::{self, HarvesterConfig};
use crate::errors::HarvesterError;
use crate::session::HarvestSession;
use crate::storage::{Database, KeyValueStore};

pub async fn load_settings(config_path: Option<&str>) -> Result<HarvesterConfig, HarvesterError> {
    let path = config_path.map(PathBuf::from);
    config::load_config(path.as_deref()).await
}

pub fn build_api(config: &HarvesterConfig) -> Result<Arc<ApiClient>, HarvesterError> {
    let on_expired: Arc<dyn SessionExpiredHandler> = Arc::new(|| {
        eprintln!("Session expired. Sign in to the portal again and retry.");
    });
    Ok(Arc::new(ApiClient::new(&config.api, on_expired)?))
}

pub fn open_storage(config: &HarvesterConfig) -> Result<Arc<dyn KeyValueStore>, HarvesterError> {
    let db = Database::new(&config.storage.path)?;
    debug!(path = %config.storage.path, "Opened preference storage");
    Ok(Arc::new(db))
}

/// Load configuration, open local storage and build a session.
pub async fn open_session(config_path: Option<&str>) -> Result<(HarvesterConfig, HarvestSession), HarvesterError> {
    let config = load_settings(config_path).await?;
    let storage = open_storage(&config)?;
    let api = build_api(&config)?;
    let session = HarvestSession::new(api, storage, &config.lookup);
    Ok((config, session))
}
