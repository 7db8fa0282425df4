use std::sync::Arc;
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::models::{LookupType, Preset};
use crate::storage::prefs::{write_json, SELECTION_KEY};
use crate::storage::KeyValueStore;
use super::ProviderSelection;

/// Owner of the provider selection. Every change is persisted.
pub struct ProviderSelectionStore {
    selection: ProviderSelection,
    storage: Arc<dyn KeyValueStore>,
}

impl ProviderSelectionStore {
    /// Read the persisted selection, falling back to defaults per type (or
    /// entirely, if the stored value is not a JSON object).
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let selection = Self::read_persisted(storage.as_ref());
        Self { selection, storage }
    }

    fn read_persisted(storage: &dyn KeyValueStore) -> ProviderSelection {
        let raw = match storage.get(SELECTION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ProviderSelection::defaults(),
            Err(e) => {
                warn!(error = %e, "Failed to read provider selection, using defaults");
                return ProviderSelection::defaults();
            }
        };

        let stored = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!("Persisted provider selection is corrupt, using defaults");
                return ProviderSelection::defaults();
            }
        };

        let mut selection = ProviderSelection::default();
        for lookup_type in LookupType::all() {
            let ids = stored
                .get(lookup_type.as_str())
                .and_then(string_array)
                .unwrap_or_else(|| lookup_type.default_providers());
            selection.set(lookup_type, ids);
        }
        debug!(enabled = selection.enabled_types().len(), "Loaded provider selection");
        selection
    }

    pub fn set_providers_for_type(&mut self, lookup_type: LookupType, provider_ids: Vec<String>) {
        self.selection.set(lookup_type, provider_ids);
        info!(
            lookup_type = %lookup_type,
            providers = ?self.selection.providers_for(lookup_type),
            "Provider selection changed"
        );
        self.persist();
    }

    pub fn enabled_types(&self) -> Vec<LookupType> {
        self.selection.enabled_types()
    }

    pub fn providers_for_type(&self, lookup_type: LookupType) -> &[String] {
        self.selection.providers_for(lookup_type)
    }

    pub fn selection(&self) -> &ProviderSelection {
        &self.selection
    }

    pub fn snapshot(&self) -> ProviderSelection {
        self.selection.clone()
    }

    /// Replace the whole selection with a preset's bundle. Types the preset
    /// does not mention are disabled. Returns type names the preset used
    /// that this client does not know.
    pub fn apply_preset(&mut self, preset: &Preset) -> Vec<String> {
        let mut selection = ProviderSelection::default();
        for lookup_type in LookupType::all() {
            selection.set(lookup_type, Vec::new());
        }

        let mut unknown = Vec::new();
        for (name, ids) in &preset.providers_by_type {
            match LookupType::parse(name) {
                Some(lookup_type) => selection.set(lookup_type, ids.clone()),
                None => unknown.push(name.clone()),
            }
        }
        unknown.sort();

        if !unknown.is_empty() {
            warn!(preset = %preset.name, unknown = ?unknown, "Preset references unknown lookup types");
        }

        self.selection = selection;
        info!(preset = %preset.name, enabled = self.selection.enabled_types().len(), "Applied provider preset");
        self.persist();
        unknown
    }

    pub fn reset_to_defaults(&mut self) {
        self.selection = ProviderSelection::defaults();
        info!("Provider selection reset to defaults");
        self.persist();
    }

    fn persist(&self) {
        write_json(self.storage.as_ref(), SELECTION_KEY, &self.selection.to_named_map());
    }
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::storage::MemoryStore;

    fn store_with(raw: &str) -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::with_value(SELECTION_KEY, raw))
    }

    #[test]
    fn test_load_without_persisted_value_uses_defaults() {
        let store = ProviderSelectionStore::load(Arc::new(MemoryStore::new()));
        assert_eq!(store.snapshot(), ProviderSelection::defaults());
    }

    #[test]
    fn test_load_invalid_json_uses_full_defaults() {
        let store = ProviderSelectionStore::load(store_with("{whois: [oops"));
        assert_eq!(store.snapshot(), ProviderSelection::defaults());
    }

    #[test]
    fn test_load_non_object_uses_full_defaults() {
        let store = ProviderSelectionStore::load(store_with("[\"whois\"]"));
        assert_eq!(store.snapshot(), ProviderSelection::defaults());
    }

    #[test]
    fn test_load_falls_back_per_type() {
        let store = ProviderSelectionStore::load(store_with(
            r#"{"whois": ["whoisxml"], "dns": "google", "ip_info": [1, 2], "screenshot": []}"#,
        ));
        assert_eq!(store.providers_for_type(LookupType::Whois), ["whoisxml".to_string()]);
        // invalid entries fall back to the type's defaults
        assert_eq!(store.providers_for_type(LookupType::Dns), ["dns".to_string()]);
        assert_eq!(store.providers_for_type(LookupType::IpInfo), ["ipinfo".to_string()]);
        // an explicit empty list stays disabled
        assert!(store.providers_for_type(LookupType::Screenshot).is_empty());
        // missing keys take defaults too
        assert_eq!(store.providers_for_type(LookupType::CveDetails), ["nvd".to_string()]);
    }

    #[test]
    fn test_set_persists_full_map() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut store = ProviderSelectionStore::load(storage.clone());
        store.set_providers_for_type(LookupType::Dns, vec!["cloudflare".into()]);

        let reloaded = ProviderSelectionStore::load(storage);
        assert_eq!(reloaded.providers_for_type(LookupType::Dns), ["cloudflare".to_string()]);
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[test]
    fn test_enabled_types_reflect_non_empty_lists() {
        let mut store = ProviderSelectionStore::load(Arc::new(MemoryStore::new()));
        store.set_providers_for_type(LookupType::Whois, vec![]);
        assert!(!store.enabled_types().contains(&LookupType::Whois));
        assert!(store.enabled_types().contains(&LookupType::Dns));
    }

    #[test]
    fn test_apply_preset_replaces_everything() {
        let mut store = ProviderSelectionStore::load(Arc::new(MemoryStore::new()));
        let mut providers_by_type = HashMap::new();
        providers_by_type.insert("reputation".to_string(), vec!["abuseipdb".to_string()]);
        providers_by_type.insert("asn".to_string(), vec!["bgpview".to_string()]);
        let preset = Preset { name: "IP triage".into(), description: None, providers_by_type };

        let unknown = store.apply_preset(&preset);
        assert_eq!(unknown, vec!["asn".to_string()]);
        assert_eq!(store.enabled_types(), vec![LookupType::Reputation]);
    }

    #[test]
    fn test_reset_to_defaults() {
        let mut store = ProviderSelectionStore::load(Arc::new(MemoryStore::new()));
        store.set_providers_for_type(LookupType::Whois, vec![]);
        store.reset_to_defaults();
        assert_eq!(store.snapshot(), ProviderSelection::defaults());
    }
}
