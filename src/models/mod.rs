pub mod indicator;
pub mod lookup_type;
pub mod result;
pub mod providers;

pub use indicator::*;
pub use lookup_type::{LookupType, LookupTypeDefinition, LOOKUP_TYPES};
pub use result::*;
pub use providers::*;
