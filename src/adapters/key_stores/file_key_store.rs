use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{CipherpostError, Result};
use crate::core::models::key_record::KeyRecord;
use crate::core::traits::key_store::KeyStore;

/// Current on-disk keyring format.
pub const KEYRING_VERSION: u32 = 1;

/// File-based keyring that persists key records as JSON.
///
/// Example `keyring.json`:
/// ```text
/// {
///   "version": 1,
///   "keys": [
///     { "long_identifier": "7F3A9C...", "user_id": "Alice <alice@example.org>", ... }
///   ]
/// }
/// ```
#[derive(Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Keyring {
    version: u32,
    #[serde(default)]
    keys: Vec<KeyRecord>,
}

impl FileKeyStore {
    /// Create a key store backed by the given file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Return the file path this store reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write an empty keyring.
    pub fn create(&self) -> Result<()> {
        self.save(Vec::new())
    }

    fn load(&self) -> Result<Keyring> {
        if !self.path.exists() {
            return Ok(Keyring {
                version: KEYRING_VERSION,
                keys: Vec::new(),
            });
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|_| CipherpostError::FileNotFound {
                path: self.path.clone(),
            })?;

        let keyring: Keyring =
            serde_json::from_str(&content).map_err(|e| CipherpostError::Serialization {
                detail: format!("{}: {e}", self.path.display()),
            })?;

        if keyring.version > KEYRING_VERSION {
            return Err(CipherpostError::FormatVersionTooNew {
                found: keyring.version,
                supported: KEYRING_VERSION,
            });
        }

        Ok(keyring)
    }

    fn save(&self, keys: Vec<KeyRecord>) -> Result<()> {
        let keyring = Keyring {
            version: KEYRING_VERSION,
            keys,
        };
        let json =
            serde_json::to_string_pretty(&keyring).map_err(|e| CipherpostError::Serialization {
                detail: e.to_string(),
            })?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json + "\n")?;
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn add(&self, key: &KeyRecord) -> Result<()> {
        let mut existing = self.load()?.keys;

        if let Some(pos) = existing
            .iter()
            .position(|k| k.fingerprint == key.fingerprint)
        {
            // Importing the secret half of a known public key upgrades it.
            if key.has_secret_key && !existing[pos].has_secret_key {
                tracing::debug!(key = %key.long_identifier, "upgrading public key to secret key");
                existing[pos] = key.clone();
                return self.save(existing);
            }
            return Err(CipherpostError::KeyAlreadyExists {
                identity: key.long_identifier.clone(),
            });
        }

        existing.push(key.clone());
        self.save(existing)
    }

    fn list(&self) -> Result<Vec<KeyRecord>> {
        Ok(self.load()?.keys)
    }

    fn remove(&self, selector: &str) -> Result<()> {
        let existing = self.load()?.keys;
        let trimmed = selector.trim().trim_start_matches("0x");

        let is_target = |k: &KeyRecord| {
            k.long_identifier.eq_ignore_ascii_case(trimmed)
                || k.fingerprint.eq_ignore_ascii_case(trimmed)
        };

        if !existing.iter().any(is_target) {
            return Err(CipherpostError::KeyNotFound {
                identity: selector.to_string(),
            });
        }

        let filtered: Vec<_> = existing.into_iter().filter(|k| !is_target(k)).collect();
        self.save(filtered)
    }
}
