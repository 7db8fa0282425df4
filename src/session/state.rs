use serde::Serialize;
use crate::models::LookupType;

/// One indicator whose lookup failed as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupFailure {
    pub indicator: String,
    pub error: String,
    pub error_type: &'static str,
}

/// Outcome of one bulk lookup run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkReport {
    pub loaded: Vec<String>,
    /// Indicators left out because their type is not resolved yet.
    pub skipped: Vec<String>,
    pub failures: Vec<LookupFailure>,
    pub duration_ms: u64,
}

impl BulkReport {
    /// When nothing loaded and every indicator failed the same way, that one
    /// message stands for the whole batch.
    pub fn common_failure(&self) -> Option<&str> {
        if !self.loaded.is_empty() {
            return None;
        }
        let (first, rest) = self.failures.split_first()?;
        rest.iter()
            .all(|f| f.error == first.error)
            .then_some(first.error.as_str())
    }

    pub fn attempted(&self) -> usize {
        self.loaded.len() + self.failures.len()
    }
}

/// What one auto-load pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutoLoadReport {
    /// Bulk load of indicators seen for the first time.
    pub initial: Option<BulkReport>,
    /// Types re-fetched after their provider set changed.
    pub refetched: Vec<LookupType>,
    /// Types whose cached results were dropped because they were disabled.
    pub purged: Vec<LookupType>,
    pub failures: Vec<LookupFailure>,
}

impl AutoLoadReport {
    pub fn is_noop(&self) -> bool {
        self.initial.is_none() && self.refetched.is_empty() && self.purged.is_empty()
    }
}
