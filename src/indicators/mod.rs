pub mod identify;
pub mod store;

pub use identify::{identify_now, Identification, TypeIdentifier};
pub use store::{parse_indicators, IndicatorStore};
