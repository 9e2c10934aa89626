use secrecy::SecretString;

use crate::core::errors::Result;

/// Port for the secure store that holds secret-key passphrases.
pub trait PassphraseStore: Send + Sync {
    /// Look up the passphrase for a key by long identifier.
    ///
    /// `reason` is shown to the user when the store has to ask.
    /// `Ok(None)` means the store holds nothing for this key; an error
    /// means the lookup itself failed or was cancelled.
    fn lookup(&self, key_id: &str, reason: &str) -> Result<Option<SecretString>>;
}

impl<T: PassphraseStore + ?Sized> PassphraseStore for Box<T> {
    fn lookup(&self, key_id: &str, reason: &str) -> Result<Option<SecretString>> {
        (**self).lookup(key_id, reason)
    }
}
