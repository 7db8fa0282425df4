use std::collections::HashSet;
use tracing::debug;
use crate::indicators::IndicatorStore;
use crate::selection::{diff_selections, ProviderSelection, SelectionChange};

/// Decides when lookups should run without an explicit request.
///
/// Holds no I/O of its own: the session asks it what to load, runs the
/// lookups, then reports back with `mark_loaded`.
#[derive(Debug, Clone)]
pub struct AutoLoadController {
    enabled: bool,
    loaded: HashSet<String>,
    previous: ProviderSelection,
}

impl AutoLoadController {
    pub fn new(enabled: bool, initial: ProviderSelection) -> Self {
        Self {
            enabled,
            loaded: HashSet::new(),
            previous: initial,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Auto-load runs only when enabled and every indicator has a type.
    pub fn guard_open(&self, indicators: &IndicatorStore) -> bool {
        self.enabled && !indicators.is_empty() && indicators.all_types_resolved()
    }

    /// Indicators that have never had an auto-load, in list order.
    pub fn pending_initial_load(&self, indicators: &IndicatorStore) -> Vec<String> {
        if !self.guard_open(indicators) {
            return Vec::new();
        }
        indicators
            .values()
            .iter()
            .filter(|v| !self.loaded.contains(*v))
            .cloned()
            .collect()
    }

    /// Compare `current` with the last observed selection and remember it.
    ///
    /// The snapshot advances even while the guard is closed, so a change made
    /// while auto-load is off is never replayed later.
    pub fn observe_selection(
        &mut self,
        indicators: &IndicatorStore,
        current: &ProviderSelection,
    ) -> Option<SelectionChange> {
        let change = diff_selections(&self.previous, current);
        self.previous = current.clone();

        if change.is_empty() || !self.guard_open(indicators) {
            return None;
        }
        debug!(
            newly_enabled = ?change.newly_enabled,
            disabled = ?change.disabled,
            "Provider selection changed"
        );
        Some(change)
    }

    pub fn mark_loaded<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loaded.extend(values.into_iter().map(Into::into));
    }

    pub fn is_loaded(&self, value: &str) -> bool {
        self.loaded.contains(value)
    }

    pub fn forget(&mut self, value: &str) {
        self.loaded.remove(value);
    }

    pub fn reset(&mut self) {
        self.loaded.clear();
    }
}
