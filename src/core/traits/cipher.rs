use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::core::errors::Result;
use crate::core::models::compose::Recipient;
use crate::core::models::key_record::KeyRecord;
use crate::core::models::message::{Decrypted, MessageDetail, MessageKind};

/// Port for OpenPGP backends.
///
/// Implementations live in `adapters::cipher` (e.g. SequoiaBackend).
/// The services only depend on this trait, never on a concrete backend.
/// Passphrases are handed over per call; a backend never caches them.
pub trait CipherBackend: Send + Sync {
    /// Parse armored key material into a keyring record.
    fn inspect_key(&self, armored: &str) -> Result<KeyRecord>;

    /// Armored public half of a key.
    fn export_public(&self, key: &KeyRecord) -> Result<String>;

    /// Generate a new key pair and return the armored secret key.
    fn generate_key(&self, user_id: &str, passphrase: Option<&SecretString>) -> Result<String>;

    /// Cheap envelope probe. No decryption, no signature check.
    fn classify(&self, text: &str) -> MessageKind;

    /// Verify a cleartext-signed message against one key at time `at`,
    /// returning the signed body.
    fn verify_cleartext(&self, text: &str, signer: &KeyRecord, at: DateTime<Utc>)
    -> Result<String>;

    /// Check that `passphrase` opens the secret material of `key`.
    fn unlock(&self, key: &KeyRecord, passphrase: &SecretString) -> Result<()>;

    /// Read recipient and signer metadata as seen through one secret key.
    fn message_detail(
        &self,
        armored: &str,
        key: &KeyRecord,
        passphrase: Option<&SecretString>,
    ) -> Result<MessageDetail>;

    /// Decrypt with one secret key, ignoring signatures.
    fn decrypt(
        &self,
        armored: &str,
        key: &KeyRecord,
        passphrase: Option<&SecretString>,
    ) -> Result<Decrypted>;

    /// Decrypt with one secret key and require a good signature by `signer`.
    fn decrypt_verify(
        &self,
        armored: &str,
        key: &KeyRecord,
        passphrase: Option<&SecretString>,
        signer: &KeyRecord,
    ) -> Result<Decrypted>;

    /// Encrypt to every recipient, signing when a signer is given.
    fn encrypt(
        &self,
        plaintext: &str,
        recipients: &[Recipient<'_>],
        signer: Option<(&KeyRecord, Option<&SecretString>)>,
    ) -> Result<String>;

    /// Produce a cleartext-signed message.
    fn clearsign(
        &self,
        plaintext: &str,
        signer: &KeyRecord,
        passphrase: Option<&SecretString>,
    ) -> Result<String>;

    /// Human-readable name of this backend (e.g. "sequoia").
    fn name(&self) -> &str;
}
