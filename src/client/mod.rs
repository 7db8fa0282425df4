pub mod api;
pub mod http;
pub mod transport;

pub use api::{BatchLookupRequest, BatchLookupResponse, HarvesterApi, IdentifiedIndicator, IndicatorRecords};
pub use http::ApiClient;
pub use transport::{AttemptOutcome, LogSessionExpired, SessionExpiredHandler, Transport};
