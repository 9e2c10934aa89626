use std::collections::HashMap;
use std::sync::Mutex;

use secrecy::SecretString;

use crate::core::errors::{CipherpostError, Result};
use crate::core::traits::passphrase_store::PassphraseStore;

/// In-memory passphrase store.
///
/// Records every lookup. Keys marked as failing make the lookup itself
/// error, the way a cancelled or broken keychain would.
#[derive(Default)]
pub struct MemoryPassphraseStore {
    entries: HashMap<String, SecretString>,
    failing: Vec<String>,
    lookups: Mutex<Vec<String>>,
}

impl MemoryPassphraseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key_id: &str, passphrase: &str) -> Self {
        self.entries.insert(
            key_id.to_ascii_uppercase(),
            SecretString::from(passphrase.to_string()),
        );
        self
    }

    /// Make lookups for `key_id` fail.
    pub fn failing(mut self, key_id: &str) -> Self {
        self.failing.push(key_id.to_ascii_uppercase());
        self
    }

    /// Key IDs asked for so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

impl PassphraseStore for MemoryPassphraseStore {
    fn lookup(&self, key_id: &str, _reason: &str) -> Result<Option<SecretString>> {
        let id = key_id.to_ascii_uppercase();
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(id.clone());
        }
        if self.failing.contains(&id) {
            return Err(CipherpostError::KeychainUnlockFail { key_id: id });
        }
        Ok(self.entries.get(&id).cloned())
    }
}
