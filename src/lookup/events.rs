use crate::models::LookupType;

/// Progress messages emitted while lookups run, for whatever renders
/// loading state.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupEvent {
    /// A bulk lookup over several indicators began
    BulkStarted {
        indicators: usize,
    },
    /// One indicator's bulk lookup finished
    IndicatorLoaded {
        indicator: String,
        results: usize,
        errors: usize,
    },
    /// One indicator's lookup failed as a whole
    IndicatorFailed {
        indicator: String,
        error: String,
    },
    /// The indicator was not looked up because its type is unresolved
    IndicatorSkipped {
        indicator: String,
    },
    /// A bulk lookup finished for every indicator
    BulkCompleted {
        loaded: usize,
        failed: usize,
        duration_ms: u64,
    },
    /// A single-category load began
    CategoryStarted {
        indicator: String,
        lookup_type: LookupType,
    },
    CategoryLoaded {
        indicator: String,
        lookup_type: LookupType,
        results: usize,
    },
    CategoryFailed {
        indicator: String,
        lookup_type: LookupType,
        error: String,
    },
}
