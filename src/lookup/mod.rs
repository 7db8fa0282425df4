pub mod autoload;
pub mod events;
pub mod executor;
pub mod merger;

pub use autoload::AutoLoadController;
pub use events::LookupEvent;
pub use executor::{plan_request, LookupExecutor, RequestPlan};
pub use merger::{merge, ManualResults, ResultSet};
