use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use super::KeyValueStore;

pub const SELECTION_KEY: &str = "harvester.provider_selection";
pub const AUTO_LOAD_KEY: &str = "harvester.auto_load";
pub const INDICATORS_KEY: &str = "harvester.indicators";
pub const LAYOUT_KEY: &str = "harvester.layout";

/// Read and decode a JSON value. Missing keys, storage failures and malformed
/// JSON all come back as `None`.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted value");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Ignoring malformed persisted value");
            None
        }
    }
}

/// Encode and write a JSON value. Best-effort: failures are logged only.
pub fn write_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key, error = %e, "Failed to encode value for persistence");
            return;
        }
    };
    match store.set(key, &raw) {
        Ok(()) => debug!(key, "Persisted value"),
        Err(e) => warn!(key, error = %e, "Failed to persist value"),
    }
}

/// How result cards are laid out in the harvester view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Grid,
    List,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
        }
    }
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "list" => Ok(Self::List),
            other => Err(format!("Invalid layout: {}", other)),
        }
    }
}

pub fn load_auto_load(store: &dyn KeyValueStore, default: bool) -> bool {
    read_json(store, AUTO_LOAD_KEY).unwrap_or(default)
}

pub fn save_auto_load(store: &dyn KeyValueStore, enabled: bool) {
    write_json(store, AUTO_LOAD_KEY, &enabled);
}

pub fn load_layout(store: &dyn KeyValueStore) -> Layout {
    read_json(store, LAYOUT_KEY).unwrap_or_default()
}

pub fn save_layout(store: &dyn KeyValueStore, layout: Layout) {
    write_json(store, LAYOUT_KEY, &layout);
}

pub fn load_indicators(store: &dyn KeyValueStore) -> Vec<String> {
    read_json(store, INDICATORS_KEY).unwrap_or_default()
}

pub fn save_indicators(store: &dyn KeyValueStore, values: &[String]) {
    write_json(store, INDICATORS_KEY, values);
}
