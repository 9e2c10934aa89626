use serde::{Deserialize, Serialize};

/// A key held in the local keyring.
///
/// Carries the identifiers the interpreter matches on plus the armored
/// material itself. The core never mutates a record: unlocking is a
/// per-operation check performed by the cipher backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// 16-hex long key ID of the primary key.
    pub long_identifier: String,
    pub fingerprint: String,
    pub user_id: String,
    pub has_public_key: bool,
    pub has_secret_key: bool,
    /// Encryption-capable subkey IDs, preferred one first.
    #[serde(default)]
    pub encryption_key_ids: Vec<String>,
    /// Primary key ID followed by every subkey ID.
    #[serde(default)]
    pub key_ids: Vec<String>,
    /// Secret material is protected by a passphrase.
    #[serde(default)]
    pub locked: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Armored certificate (transferable secret key when `has_secret_key`).
    pub armored: String,
}

impl KeyRecord {
    /// The subkey ID actually used when encrypting to this key.
    pub fn encryption_key_id(&self) -> Option<&str> {
        self.encryption_key_ids.first().map(|s| s.as_str())
    }

    /// Whether `id` names one of this key's encryption subkeys.
    pub fn has_encryption_key_id(&self, id: &str) -> bool {
        self.encryption_key_ids
            .iter()
            .any(|k| k.eq_ignore_ascii_case(id))
    }

    /// Whether `id` names the primary key or any subkey.
    pub fn has_key_id(&self, id: &str) -> bool {
        self.long_identifier.eq_ignore_ascii_case(id)
            || self.key_ids.iter().any(|k| k.eq_ignore_ascii_case(id))
    }

    /// Whether `selector` picks this key: long ID, fingerprint or user ID.
    pub fn matches(&self, selector: &str) -> bool {
        let trimmed = selector.trim().trim_start_matches("0x");
        self.has_key_id(trimmed)
            || self.fingerprint.eq_ignore_ascii_case(trimmed)
            || self.user_id == selector.trim()
    }

    /// Whether this key can sign: both halves must be present.
    pub fn can_sign(&self) -> bool {
        self.has_public_key && self.has_secret_key
    }
}

impl std::fmt::Display for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.long_identifier, self.user_id)
    }
}
