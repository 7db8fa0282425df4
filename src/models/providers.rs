use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use super::lookup_type::LookupType;

/// A backend data source for one lookup type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProviderInfo {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A canned provider-selection bundle offered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub providers_by_type: HashMap<String, Vec<String>>,
}

/// Response of the providers metadata endpoint.
///
/// Provider lists are keyed by the backend's lookup-type names; names this
/// client does not know are kept but never consulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersMetadata {
    #[serde(default)]
    pub providers: BTreeMap<String, Vec<ProviderInfo>>,
    #[serde(default)]
    pub presets: Vec<Preset>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
}

impl ProvidersMetadata {
    pub fn providers_for(&self, lookup_type: LookupType) -> &[ProviderInfo] {
        self.providers
            .get(lookup_type.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_available(&self, lookup_type: LookupType, provider_id: &str) -> bool {
        self.providers_for(lookup_type)
            .iter()
            .any(|p| p.available && p.id == provider_id)
    }

    /// IDs of providers currently reported as available for a type.
    pub fn available_ids(&self, lookup_type: LookupType) -> Vec<&str> {
        self.providers_for(lookup_type)
            .iter()
            .filter(|p| p.available)
            .map(|p| p.id.as_str())
            .collect()
    }

    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}
