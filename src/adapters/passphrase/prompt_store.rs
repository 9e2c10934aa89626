use std::io;
use std::sync::Mutex;

use secrecy::SecretString;

use crate::core::errors::{CipherpostError, Result};
use crate::core::traits::passphrase_store::PassphraseStore;

/// Source of typed passphrases.
pub trait PasswordReader: Send {
    /// Show `prompt` and read one answer without echoing it.
    fn read_password(&mut self, prompt: &str) -> io::Result<String>;
}

/// Reads from the controlling terminal, never from stdin, so piped
/// message text and typed passphrases do not mix.
pub struct Terminal;

impl PasswordReader for Terminal {
    fn read_password(&mut self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt)
    }
}

/// Asks for passphrases on the terminal.
///
/// An empty answer cancels the lookup, which surfaces as
/// `KeychainUnlockFail` to callers that need the key. Prompt and answer
/// happen under one lock so parallel lookups never interleave.
pub struct PromptPassphraseStore<R = Terminal> {
    reader: Mutex<R>,
}

impl PromptPassphraseStore<Terminal> {
    pub fn terminal() -> Self {
        Self::new(Terminal)
    }
}

impl<R: PasswordReader> PromptPassphraseStore<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }
}

impl<R: PasswordReader> PassphraseStore for PromptPassphraseStore<R> {
    fn lookup(&self, key_id: &str, reason: &str) -> Result<Option<SecretString>> {
        let cancelled = || CipherpostError::KeychainUnlockFail {
            key_id: key_id.to_string(),
        };

        let mut reader = self.reader.lock().map_err(|_| CipherpostError::Internal {
            detail: "passphrase prompt poisoned".into(),
        })?;
        let answer = reader
            .read_password(&format!("  {reason} ({key_id}): "))
            .map_err(|e| {
                tracing::debug!(key = key_id, error = %e, "no terminal answer");
                cancelled()
            })?;

        let answer = answer.trim_end_matches(['\r', '\n']);
        if answer.is_empty() {
            return Err(cancelled());
        }
        Ok(Some(SecretString::from(answer.to_string())))
    }
}
