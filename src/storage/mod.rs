pub mod connection;
pub mod memory;
pub mod prefs;
pub mod schema;
pub mod settings;

use crate::errors::HarvesterError;

pub use connection::Database;
pub use memory::MemoryStore;
pub use prefs::Layout;

/// Durable string key/value storage for client-side preferences.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, HarvesterError>;
    fn set(&self, key: &str, value: &str) -> Result<(), HarvesterError>;
    fn remove(&self, key: &str) -> Result<(), HarvesterError>;
}
