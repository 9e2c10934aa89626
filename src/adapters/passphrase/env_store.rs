use std::collections::HashMap;

use secrecy::SecretString;

use crate::core::errors::Result;
use crate::core::traits::passphrase_store::PassphraseStore;

/// Prefix of the per-key passphrase variables.
pub const ENV_PREFIX: &str = "CIPHERPOST_PASSPHRASE_";

/// Reads passphrases from `CIPHERPOST_PASSPHRASE_<LONG_ID>` variables.
///
/// The environment is captured once at construction. Key IDs are
/// matched case-insensitively.
pub struct EnvPassphraseStore {
    vars: HashMap<String, SecretString>,
}

impl EnvPassphraseStore {
    /// Snapshot the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit name/value pairs. Unrelated names are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let id = name.as_ref().strip_prefix(ENV_PREFIX)?;
                if id.is_empty() {
                    return None;
                }
                Some((id.to_ascii_uppercase(), SecretString::from(value.into())))
            })
            .collect();
        Self { vars }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl PassphraseStore for EnvPassphraseStore {
    fn lookup(&self, key_id: &str, _reason: &str) -> Result<Option<SecretString>> {
        Ok(self.vars.get(&key_id.to_ascii_uppercase()).cloned())
    }
}
