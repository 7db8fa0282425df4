pub mod types;
pub mod classification;

pub use types::{HarvesterError, NO_PROVIDERS_MESSAGE};
pub use classification::ErrorClassification;
