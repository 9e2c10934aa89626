use crate::core::errors::{CipherpostError, Result};
use crate::core::models::key_record::KeyRecord;

/// Port for the local keyring.
pub trait KeyStore: Send + Sync {
    /// Add a key to the store.
    fn add(&self, key: &KeyRecord) -> Result<()>;

    /// List all keys. Order is stable across calls.
    fn list(&self) -> Result<Vec<KeyRecord>>;

    /// Remove a key by long identifier or fingerprint.
    fn remove(&self, selector: &str) -> Result<()>;

    /// Find the first key matching a long ID, fingerprint or user ID.
    fn get(&self, selector: &str) -> Result<KeyRecord> {
        self.list()?
            .into_iter()
            .find(|k| k.matches(selector))
            .ok_or_else(|| CipherpostError::KeyNotFound {
                identity: selector.to_string(),
            })
    }
}
