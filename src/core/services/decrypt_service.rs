use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};

use super::cleartext_verifier;
use super::inflight::InFlight;
use super::recipient_resolver::{self, Resolution, UnlockedKeys};
use crate::core::errors::{CipherpostError, Result};
use crate::core::models::decrypt_result::{DecryptResult, VerifyOutcome};
use crate::core::models::key_record::KeyRecord;
use crate::core::models::message::MessageKind;
use crate::core::traits::cipher::CipherBackend;
use crate::core::traits::key_store::KeyStore;
use crate::core::traits::passphrase_store::PassphraseStore;

const UNLOCK_REASON: &str = "Unlock secret key to decrypt message";

/// Shared outcome handed to every caller of a coalesced request.
pub type SharedResult = Arc<Result<DecryptResult>>;

/// Interprets armored messages against the local keyring.
///
/// Combines a `CipherBackend` for the cryptography, a `KeyStore` for
/// the keys and a `PassphraseStore` for locked secret keys.
pub struct DecryptService<C: CipherBackend, K: KeyStore, P: PassphraseStore> {
    pub cipher: C,
    pub key_store: K,
    pub passphrases: P,
    inflight: InFlight<String, SharedResult>,
}

impl<C: CipherBackend, K: KeyStore, P: PassphraseStore> DecryptService<C, K, P> {
    pub fn new(cipher: C, key_store: K, passphrases: P) -> Self {
        Self {
            cipher,
            key_store,
            passphrases,
            inflight: InFlight::new(),
        }
    }

    /// Decrypt and/or verify one armored message.
    ///
    /// A cleartext-signed message verified by a local key returns right
    /// away. Anything else is treated as an encrypted message: secret
    /// keys are unlocked, declared recipients are reconciled with the
    /// keyring, hidden recipients are searched by trial decryption, and
    /// the first candidate decrypts.
    pub fn decrypt(&self, armored: &str) -> Result<DecryptResult> {
        let keys = self.key_store.list()?;
        tracing::debug!(backend = self.cipher.name(), keys = keys.len(), "interpreting message");

        if self.cipher.classify(armored) == MessageKind::Cleartext {
            if let Some(verified) =
                cleartext_verifier::verify(&self.cipher, armored, &keys, Utc::now())
            {
                tracing::debug!(signer = %verified.signer.long_identifier, "cleartext signature verified");
                return Ok(DecryptResult {
                    message: verified.body,
                    signature_key: Some(verified.signer),
                    recipient_keys: Vec::new(),
                    verify_result: VerifyOutcome::Valid,
                    unknown_recipient_key_ids: Vec::new(),
                });
            }
            tracing::debug!("no local key verifies the cleartext signature, trying as encrypted");
        }

        let armored = armored.trim();
        if self.cipher.classify(armored) != MessageKind::Encrypted {
            return Err(CipherpostError::BadPayload);
        }

        let secret_keys: Vec<KeyRecord> =
            keys.iter().filter(|k| k.has_secret_key).cloned().collect();

        let unlocked = self.unlock_keys(&secret_keys);
        let mut resolution =
            recipient_resolver::resolve(&self.cipher, armored, &secret_keys, &keys, &unlocked);

        if !resolution.hidden_ids.is_empty() {
            self.search_hidden(armored, &secret_keys, &unlocked, &mut resolution);
        }

        let Some(decrypt_key) = resolution.candidates.first() else {
            for failure in &resolution.failures {
                tracing::warn!(key = %failure.key_id, error = %failure.error, "could not read the message with this key");
            }
            for key in &resolution.locked_matches {
                tracing::warn!(key = %key.long_identifier, "addressed to this key, but it stayed locked");
            }
            return Err(CipherpostError::NoAvailableDecryptKey);
        };
        let passphrase = unlocked.passphrase(decrypt_key);

        tracing::debug!(key = %decrypt_key.long_identifier, "decrypting");
        let decrypted = self
            .cipher
            .decrypt(armored, decrypt_key, passphrase)
            .map_err(|e| {
                tracing::warn!(key = %decrypt_key.long_identifier, error = %e, "decryption with the first candidate failed");
                CipherpostError::NoAvailableDecryptKey
            })?;

        let signer_id = resolution
            .signer_key_id
            .clone()
            .or_else(|| decrypted.signer_ids.first().cloned());

        let (signature_key, verify_result) = match signer_id {
            None => (None, VerifyOutcome::NoSignature),
            Some(id) => match keys.iter().find(|k| k.has_public_key && k.has_key_id(&id)) {
                Some(signer) => {
                    let outcome = match self.cipher.decrypt_verify(
                        armored,
                        decrypt_key,
                        passphrase,
                        signer,
                    ) {
                        Ok(_) => VerifyOutcome::Valid,
                        Err(e) => {
                            tracing::info!(signer = %signer.long_identifier, error = %e, "signature did not verify");
                            VerifyOutcome::Invalid
                        }
                    };
                    (Some(signer.clone()), outcome)
                }
                None => {
                    let mut candidates = decrypted.signer_ids.clone();
                    if !candidates.contains(&id) {
                        candidates.insert(0, id);
                    }
                    (None, VerifyOutcome::UnknownSigner(candidates))
                }
            },
        };

        let message = String::from_utf8(decrypted.plaintext).map_err(|e| {
            CipherpostError::Internal {
                detail: format!("decrypted message is not UTF-8 text: {e}"),
            }
        })?;

        Ok(DecryptResult {
            message,
            signature_key,
            recipient_keys: resolution.candidates,
            verify_result,
            unknown_recipient_key_ids: resolution.unknown_ids,
        })
    }

    /// Like `decrypt`, but identical payloads interpreted at the same
    /// time share one run.
    pub fn decrypt_coalesced(&self, armored: &str) -> SharedResult {
        let digest = hex::encode(Sha256::digest(armored.trim().as_bytes()));
        self.inflight
            .run(digest, || Arc::new(self.decrypt(armored)))
    }

    /// Ask for a passphrase for every locked key and keep those that open.
    ///
    /// At most one attempt per key; failures leave the key locked.
    fn unlock_keys(&self, secret_keys: &[KeyRecord]) -> UnlockedKeys {
        let mut unlocked = UnlockedKeys::default();

        for key in secret_keys.iter().filter(|k| k.locked) {
            let passphrase = match self.passphrases.lookup(&key.long_identifier, UNLOCK_REASON) {
                Ok(Some(p)) => p,
                Ok(None) => {
                    tracing::debug!(key = %key.long_identifier, "no passphrase available");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(key = %key.long_identifier, error = %e, "passphrase lookup failed");
                    continue;
                }
            };

            match self.cipher.unlock(key, &passphrase) {
                Ok(()) => unlocked.insert(key, passphrase),
                Err(e) => {
                    tracing::warn!(key = %key.long_identifier, error = %e, "unlock failed");
                }
            }
        }

        unlocked
    }

    /// Trial-decrypt with every secret key not already confirmed.
    ///
    /// A hidden recipient carries no key ID, so each unconfirmed key is
    /// tried once; the keys that open the message are appended in
    /// keyring order.
    fn search_hidden(
        &self,
        armored: &str,
        secret_keys: &[KeyRecord],
        unlocked: &UnlockedKeys,
        resolution: &mut Resolution,
    ) {
        tracing::debug!(hidden = resolution.hidden_ids.len(), "searching hidden recipients");

        for key in secret_keys {
            if resolution.confirms(key) {
                continue;
            }
            match self
                .cipher
                .decrypt(armored, key, unlocked.passphrase(key))
            {
                Ok(_) => {
                    tracing::debug!(key = %key.long_identifier, "hidden recipient found");
                    resolution.candidates.push(key.clone());
                }
                Err(e) => {
                    tracing::trace!(key = %key.long_identifier, error = %e, "trial decryption failed");
                }
            }
        }
    }
}
