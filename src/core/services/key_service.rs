use secrecy::SecretString;

use crate::core::errors::{CipherpostError, Result};
use crate::core::models::key_record::KeyRecord;
use crate::core::traits::cipher::CipherBackend;
use crate::core::traits::key_store::KeyStore;

/// Manages the local keyring through a `KeyStore` backend.
pub struct KeyService<C: CipherBackend, K: KeyStore> {
    pub cipher: C,
    pub store: K,
}

impl<C: CipherBackend, K: KeyStore> KeyService<C, K> {
    /// Generate a key pair and add it to the keyring.
    pub fn generate(&self, user_id: &str, passphrase: Option<&SecretString>) -> Result<KeyRecord> {
        let armored = self.cipher.generate_key(user_id, passphrase)?;
        let record = self.cipher.inspect_key(&armored)?;
        self.store.add(&record)?;
        Ok(record)
    }

    /// Parse armored key material and add it to the keyring.
    pub fn import(&self, armored: &str) -> Result<KeyRecord> {
        let record = self.cipher.inspect_key(armored)?;
        self.store.add(&record)?;
        Ok(record)
    }

    /// List all keys in keyring order.
    pub fn list_keys(&self) -> Result<Vec<KeyRecord>> {
        self.store.list()
    }

    /// Find one key by long ID, fingerprint or user ID.
    pub fn find(&self, selector: &str) -> Result<KeyRecord> {
        self.store.get(selector)
    }

    /// Remove a key and return what was removed.
    pub fn remove_key(&self, selector: &str) -> Result<KeyRecord> {
        let record = self.find(selector)?;
        self.store.remove(&record.fingerprint)?;
        Ok(record)
    }

    /// Armored export. The secret half is only exported when asked for.
    pub fn export(&self, selector: &str, secret: bool) -> Result<String> {
        let record = self.find(selector)?;
        if !secret {
            return self.cipher.export_public(&record);
        }
        if !record.has_secret_key {
            return Err(CipherpostError::InvalidSigner {
                reason: format!("{record} has no secret key to export"),
            });
        }
        Ok(record.armored)
    }
}
