use std::collections::HashMap;
use crate::models::{IndicatorResult, IndicatorType, LookupResult, LookupType};
use crate::selection::ProviderSelection;

/// Lookup results per indicator, kept in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    order: Vec<String>,
    entries: HashMap<String, Vec<LookupResult>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything known for `indicator`.
    pub fn insert(&mut self, indicator: &str, results: Vec<LookupResult>) {
        if !self.entries.contains_key(indicator) {
            self.order.push(indicator.to_string());
        }
        self.entries.insert(indicator.to_string(), results);
    }

    pub fn get(&self, indicator: &str) -> Option<&[LookupResult]> {
        self.entries.get(indicator).map(Vec::as_slice)
    }

    pub fn remove(&mut self, indicator: &str) -> Option<Vec<LookupResult>> {
        let removed = self.entries.remove(indicator);
        if removed.is_some() {
            self.order.retain(|v| v != indicator);
        }
        removed
    }

    pub fn indicators(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    /// Move every indicator of `other` in, replacing existing entries.
    pub fn absorb(&mut self, other: ResultSet) {
        let ResultSet { order, mut entries } = other;
        for indicator in order {
            if let Some(results) = entries.remove(&indicator) {
                self.insert(&indicator, results);
            }
        }
    }

    fn entry_mut(&mut self, indicator: &str) -> &mut Vec<LookupResult> {
        if !self.entries.contains_key(indicator) {
            self.order.push(indicator.to_string());
        }
        self.entries.entry(indicator.to_string()).or_default()
    }

    fn retain_results(&mut self, mut keep: impl FnMut(&LookupResult) -> bool) {
        for results in self.entries.values_mut() {
            results.retain(|r| keep(r));
        }
    }
}

/// Results loaded one category at a time. These outrank bulk results with
/// the same merge key.
#[derive(Debug, Clone, Default)]
pub struct ManualResults {
    set: ResultSet,
}

impl ManualResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge freshly loaded results into the indicator's cache, replacing
    /// entries that share a merge key.
    pub fn merge_in(&mut self, indicator: &str, results: Vec<LookupResult>) {
        let cached = self.set.entry_mut(indicator);
        for result in results {
            let key = result.merge_key();
            match cached.iter_mut().find(|r| r.merge_key() == key) {
                Some(slot) => *slot = result,
                None => cached.push(result),
            }
        }
    }

    /// Drop every cached result for the given types, across all indicators.
    pub fn purge_types(&mut self, types: &[LookupType]) {
        if types.is_empty() {
            return;
        }
        self.set.retain_results(|r| !types.contains(&r.lookup_type));
    }

    /// Keep only results of `lookup_type` whose provider is still selected.
    pub fn retain_providers(&mut self, lookup_type: LookupType, providers: &[String]) {
        self.set.retain_results(|r| {
            r.lookup_type != lookup_type
                || r.provider.as_ref().is_some_and(|p| providers.contains(p))
        });
    }

    pub fn forget(&mut self, indicator: &str) {
        self.set.remove(indicator);
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }

    pub fn get(&self, indicator: &str) -> Option<&[LookupResult]> {
        self.set.get(indicator)
    }

    pub fn results(&self) -> &ResultSet {
        &self.set
    }
}

/// Combine bulk and manual results into one view per indicator.
///
/// Indicators appear in bulk order followed by manual-only ones. Within an
/// indicator, entries are unique per merge key and a manual entry replaces
/// a bulk entry with the same key in place.
///
/// The view follows the current selection without touching either input:
/// results of disabled types are hidden, and bulk results are also hidden
/// once their provider is deselected. Manual results keep explicitly
/// requested providers; selection changes prune them through
/// [`ManualResults::retain_providers`].
pub fn merge(
    bulk: &ResultSet,
    manual: &ManualResults,
    types: &HashMap<String, IndicatorType>,
    selection: &ProviderSelection,
) -> Vec<IndicatorResult> {
    let manual = manual.results();
    let mut indicators: Vec<&str> = bulk.indicators().collect();
    indicators.extend(manual.indicators().filter(|v| bulk.get(v).is_none()));

    indicators
        .into_iter()
        .map(|indicator| {
            let mut merged: Vec<LookupResult> = Vec::new();
            let mut index: HashMap<String, usize> = HashMap::new();

            let from_bulk = bulk
                .get(indicator)
                .into_iter()
                .flatten()
                .filter(|r| bulk_visible(r, selection));
            let from_manual = manual
                .get(indicator)
                .into_iter()
                .flatten()
                .filter(|r| selection.is_enabled(r.lookup_type));

            for result in from_bulk.chain(from_manual) {
                let key = result.merge_key();
                match index.get(&key) {
                    Some(&at) => merged[at] = result.clone(),
                    None => {
                        index.insert(key, merged.len());
                        merged.push(result.clone());
                    }
                }
            }

            IndicatorResult {
                indicator: indicator.to_string(),
                indicator_type: types.get(indicator).copied(),
                results: merged,
            }
        })
        .collect()
}

fn bulk_visible(result: &LookupResult, selection: &ProviderSelection) -> bool {
    let providers = selection.providers_for(result.lookup_type);
    match &result.provider {
        Some(provider) => providers.contains(provider),
        None => !providers.is_empty(),
    }
}
