pub mod manager;
pub mod state;

pub use manager::HarvestSession;
pub use state::{AutoLoadReport, BulkReport, LookupFailure};
