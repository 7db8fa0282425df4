use std::collections::HashSet;
use crate::models::LookupType;
use super::ProviderSelection;

/// Lookup types whose provider set differs between two selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionChange {
    /// Changed and enabled now: these need fetching.
    pub newly_enabled: Vec<LookupType>,
    /// Changed and disabled now: their cached results are stale.
    pub disabled: Vec<LookupType>,
}

impl SelectionChange {
    pub fn is_empty(&self) -> bool {
        self.newly_enabled.is_empty() && self.disabled.is_empty()
    }

    pub fn changed(&self) -> impl Iterator<Item = &LookupType> {
        self.newly_enabled.iter().chain(self.disabled.iter())
    }
}

/// Order-insensitive per-type comparison.
pub fn diff_selections(previous: &ProviderSelection, current: &ProviderSelection) -> SelectionChange {
    let mut change = SelectionChange::default();
    for lookup_type in LookupType::all() {
        let before: HashSet<&str> = previous.providers_for(lookup_type).iter().map(String::as_str).collect();
        let after: HashSet<&str> = current.providers_for(lookup_type).iter().map(String::as_str).collect();
        if before == after {
            continue;
        }
        if after.is_empty() {
            change.disabled.push(lookup_type);
        } else {
            change.newly_enabled.push(lookup_type);
        }
    }
    change
}
