use chrono::Utc;
use crate::errors::HarvesterError;
use super::{Database, KeyValueStore};

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, HarvesterError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")
            .map_err(|e| HarvesterError::Storage(format!("Query failed: {}", e)))?;

        match stmt.query_row(rusqlite::params![key], |row: &rusqlite::Row| row.get::<_, String>(0)) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(HarvesterError::Storage(format!("Query error: {}", e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HarvesterError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, Utc::now().to_rfc3339()],
        ).map_err(|e| HarvesterError::Storage(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HarvesterError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM settings WHERE key = ?1", rusqlite::params![key])
            .map_err(|e| HarvesterError::Storage(format!("Delete failed: {}", e)))?;
        Ok(())
    }
}
