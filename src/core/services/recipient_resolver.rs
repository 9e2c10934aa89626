use std::collections::{BTreeSet, HashMap};

use secrecy::SecretString;

use crate::core::errors::CipherpostError;
use crate::core::models::key_record::KeyRecord;
use crate::core::models::message::{MessageDetail, RecipientId};
use crate::core::traits::cipher::CipherBackend;

/// Passphrases that opened a key during the current call, by long ID.
#[derive(Default)]
pub struct UnlockedKeys {
    passphrases: HashMap<String, SecretString>,
}

impl UnlockedKeys {
    pub fn insert(&mut self, key: &KeyRecord, passphrase: SecretString) {
        self.passphrases
            .insert(key.long_identifier.clone(), passphrase);
    }

    pub fn passphrase(&self, key: &KeyRecord) -> Option<&SecretString> {
        self.passphrases.get(&key.long_identifier)
    }

    /// A key can decrypt when it has no passphrase or was unlocked.
    pub fn usable(&self, key: &KeyRecord) -> bool {
        key.has_secret_key && (!key.locked || self.passphrases.contains_key(&key.long_identifier))
    }
}

/// A secret key whose metadata probe failed.
#[derive(Debug)]
pub struct ProbeFailure {
    pub key_id: String,
    pub error: CipherpostError,
}

/// What the secret keys could tell about an encrypted message.
#[derive(Debug, Default)]
pub struct Resolution {
    /// First signer ID any key saw.
    pub signer_key_id: Option<String>,
    pub known_ids: BTreeSet<String>,
    pub hidden_ids: BTreeSet<RecipientId>,
    /// Usable secret keys named by a declared recipient ID, keyring order.
    pub candidates: Vec<KeyRecord>,
    /// Named secret keys that stayed locked.
    pub locked_matches: Vec<KeyRecord>,
    /// Declared IDs that no local key carries as an encryption subkey.
    pub unknown_ids: Vec<String>,
    pub failures: Vec<ProbeFailure>,
}

impl Resolution {
    /// Whether `key` is already confirmed by encryption subkey ID.
    pub fn confirms(&self, key: &KeyRecord) -> bool {
        self.candidates.iter().any(|c| {
            c.long_identifier == key.long_identifier
                || c.encryption_key_ids
                    .iter()
                    .any(|id| key.has_encryption_key_id(id))
        })
    }
}

/// Probe the message with every secret key and reconcile the recipient
/// IDs it declares against the local keyring.
///
/// `secret_keys` are probed; `all_keys` decide which IDs count as
/// unknown. A failing probe is recorded and the fold carries on.
pub fn resolve<C: CipherBackend + ?Sized>(
    cipher: &C,
    armored: &str,
    secret_keys: &[KeyRecord],
    all_keys: &[KeyRecord],
    unlocked: &UnlockedKeys,
) -> Resolution {
    let (details, failures) = secret_keys.iter().fold(
        (Vec::<MessageDetail>::new(), Vec::<ProbeFailure>::new()),
        |(mut details, mut failures), key| {
            match cipher.message_detail(armored, key, unlocked.passphrase(key)) {
                Ok(detail) => details.push(detail),
                Err(error) => {
                    tracing::debug!(key = %key.long_identifier, user = %key.user_id, %error, "failed to read message detail");
                    failures.push(ProbeFailure {
                        key_id: key.long_identifier.clone(),
                        error,
                    });
                }
            }
            (details, failures)
        },
    );

    let mut resolution = Resolution {
        failures,
        ..Resolution::default()
    };

    for detail in &details {
        if detail.is_signed && resolution.signer_key_id.is_none() {
            resolution.signer_key_id = detail.signed_by_key_id.clone();
        }
        let (known, hidden) = detail.partition();
        resolution.known_ids.extend(known);
        resolution.hidden_ids.extend(hidden);
    }

    for key in secret_keys {
        let named = resolution
            .known_ids
            .iter()
            .any(|id| key.has_encryption_key_id(id));
        if !named {
            continue;
        }
        if unlocked.usable(key) {
            resolution.candidates.push(key.clone());
        } else {
            tracing::info!(key = %key.long_identifier, "message is addressed to a locked key");
            resolution.locked_matches.push(key.clone());
        }
    }

    resolution.unknown_ids = resolution
        .known_ids
        .iter()
        .filter(|id| !all_keys.iter().any(|k| k.has_encryption_key_id(id)))
        .cloned()
        .collect();

    tracing::debug!(
        known = resolution.known_ids.len(),
        hidden = resolution.hidden_ids.len(),
        candidates = resolution.candidates.len(),
        unknown = resolution.unknown_ids.len(),
        failures = resolution.failures.len(),
        "resolved recipients"
    );

    resolution
}
