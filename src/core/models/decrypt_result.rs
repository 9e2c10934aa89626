use serde::Serialize;

use super::key_record::KeyRecord;

/// Signature status of an interpreted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "candidates", rename_all = "snake_case")]
pub enum VerifyOutcome {
    NoSignature,
    Valid,
    Invalid,
    /// Signed, but no local key carries any of these issuer IDs.
    UnknownSigner(Vec<String>),
}

impl std::fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyOutcome::NoSignature => write!(f, "not signed"),
            VerifyOutcome::Valid => write!(f, "valid signature"),
            VerifyOutcome::Invalid => write!(f, "INVALID signature"),
            VerifyOutcome::UnknownSigner(ids) if ids.is_empty() => {
                write!(f, "signed by an unknown key")
            }
            VerifyOutcome::UnknownSigner(ids) => {
                write!(f, "signed by unknown key {}", ids.join(", "))
            }
        }
    }
}

/// Everything the interpreter learned about one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptResult {
    pub message: String,
    #[serde(serialize_with = "summary::option")]
    pub signature_key: Option<KeyRecord>,
    /// Local secret keys that can open the message, resolution order.
    #[serde(serialize_with = "summary::list")]
    pub recipient_keys: Vec<KeyRecord>,
    pub verify_result: VerifyOutcome,
    /// Declared recipients that match no local key.
    pub unknown_recipient_key_ids: Vec<String>,
}

/// Serialize keys as identifiers only so JSON output never leaks material.
mod summary {
    use serde::ser::{SerializeSeq, Serializer};

    use crate::core::models::key_record::KeyRecord;

    #[derive(serde::Serialize)]
    struct KeySummary<'a> {
        long_identifier: &'a str,
        fingerprint: &'a str,
        user_id: &'a str,
    }

    impl<'a> From<&'a KeyRecord> for KeySummary<'a> {
        fn from(key: &'a KeyRecord) -> Self {
            Self {
                long_identifier: &key.long_identifier,
                fingerprint: &key.fingerprint,
                user_id: &key.user_id,
            }
        }
    }

    pub fn option<S: Serializer>(key: &Option<KeyRecord>, s: S) -> Result<S::Ok, S::Error> {
        match key {
            Some(k) => s.serialize_some(&KeySummary::from(k)),
            None => s.serialize_none(),
        }
    }

    pub fn list<S: Serializer>(keys: &[KeyRecord], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(keys.len()))?;
        for k in keys {
            seq.serialize_element(&KeySummary::from(k))?;
        }
        seq.end()
    }
}
