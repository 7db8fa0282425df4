pub mod diff;
pub mod store;

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::models::LookupType;

pub use diff::{diff_selections, SelectionChange};
pub use store::ProviderSelectionStore;

/// Enabled provider IDs per lookup type. An empty list disables the type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSelection {
    by_type: BTreeMap<LookupType, Vec<String>>,
}

impl ProviderSelection {
    /// Every known type with its configured default providers.
    pub fn defaults() -> Self {
        let by_type = LookupType::all()
            .map(|t| (t, t.default_providers()))
            .collect();
        Self { by_type }
    }

    pub fn providers_for(&self, lookup_type: LookupType) -> &[String] {
        self.by_type
            .get(&lookup_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set(&mut self, lookup_type: LookupType, provider_ids: Vec<String>) {
        let mut unique: Vec<String> = Vec::with_capacity(provider_ids.len());
        for id in provider_ids {
            let id = id.trim().to_string();
            if !id.is_empty() && !unique.contains(&id) {
                unique.push(id);
            }
        }
        self.by_type.insert(lookup_type, unique);
    }

    pub fn is_enabled(&self, lookup_type: LookupType) -> bool {
        !self.providers_for(lookup_type).is_empty()
    }

    /// Types with at least one provider, in table order.
    pub fn enabled_types(&self) -> Vec<LookupType> {
        LookupType::all().filter(|t| self.is_enabled(*t)).collect()
    }

    /// Wire form keyed by lookup-type name.
    pub fn to_named_map(&self) -> BTreeMap<String, Vec<String>> {
        self.by_type
            .iter()
            .map(|(t, ids)| (t.as_str().to_string(), ids.clone()))
            .collect()
    }
}
