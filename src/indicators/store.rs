use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use regex::Regex;
use crate::models::IndicatorType;

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\s]+").expect("valid separator regex"));

/// Split free text on commas, whitespace and newlines, dropping empties.
pub fn parse_indicators(raw: &str) -> Vec<String> {
    SEPARATORS
        .split(raw)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The indicators entered by the analyst, their resolved types, the bulk
/// selection set and the indicator currently on display.
#[derive(Debug, Default, Clone)]
pub struct IndicatorStore {
    values: Vec<String>,
    types: HashMap<String, IndicatorType>,
    selected: HashSet<String>,
    active: Option<String>,
}

impl IndicatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append values parsed from `raw` that are not already present
    /// (exact, case-sensitive match). Returns only the values added.
    pub fn add_indicators(&mut self, raw: &str) -> Vec<String> {
        let mut added = Vec::new();
        for value in parse_indicators(raw) {
            if self.contains(&value) {
                continue;
            }
            self.values.push(value.clone());
            added.push(value);
        }
        added
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn remove_indicator(&mut self, value: &str) -> bool {
        let before = self.values.len();
        self.values.retain(|v| v != value);
        if self.values.len() == before {
            return false;
        }
        self.forget(value);
        self.settle_active();
        true
    }

    /// Remove every selected indicator. Returns what was removed.
    pub fn remove_selected(&mut self) -> Vec<String> {
        let removed: Vec<String> = self.values
            .iter()
            .filter(|v| self.selected.contains(*v))
            .cloned()
            .collect();
        self.values.retain(|v| !self.selected.contains(v));
        for value in &removed {
            self.forget(value);
        }
        self.selected.clear();
        self.settle_active();
        removed
    }

    pub fn clear_all(&mut self) -> Vec<String> {
        let removed = std::mem::take(&mut self.values);
        self.types.clear();
        self.selected.clear();
        self.active = None;
        removed
    }

    fn forget(&mut self, value: &str) {
        self.types.remove(value);
        self.selected.remove(value);
        if self.active.as_deref() == Some(value) {
            self.active = None;
        }
    }

    fn settle_active(&mut self) {
        if self.values.is_empty() {
            self.active = None;
        }
    }

    pub fn toggle_select(&mut self, value: &str) {
        if !self.contains(value) {
            return;
        }
        if !self.selected.remove(value) {
            self.selected.insert(value.to_string());
        }
    }

    pub fn toggle_select_all(&mut self, checked: bool) {
        if checked {
            self.selected = self.values.iter().cloned().collect();
        } else {
            self.selected.clear();
        }
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.selected.contains(value)
    }

    /// Selected values in list order.
    pub fn selected(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|v| self.selected.contains(*v))
            .map(String::as_str)
            .collect()
    }

    pub fn set_active(&mut self, value: &str) -> bool {
        if !self.contains(value) {
            return false;
        }
        self.active = Some(value.to_string());
        true
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Record resolved types for values still in the list. Returns how many
    /// were applied.
    pub fn set_types(&mut self, resolved: &HashMap<String, IndicatorType>) -> usize {
        let mut applied = 0;
        for (value, indicator_type) in resolved {
            if self.contains(value) {
                self.types.insert(value.clone(), *indicator_type);
                applied += 1;
            }
        }
        applied
    }

    pub fn indicator_type(&self, value: &str) -> Option<IndicatorType> {
        self.types.get(value).copied()
    }

    pub fn types(&self) -> &HashMap<String, IndicatorType> {
        &self.types
    }

    /// True when the list is non-empty and every value has a resolved type.
    pub fn all_types_resolved(&self) -> bool {
        !self.values.is_empty() && self.values.iter().all(|v| self.types.contains_key(v))
    }

    pub fn unresolved(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|v| !self.types.contains_key(*v))
            .map(String::as_str)
            .collect()
    }
}
