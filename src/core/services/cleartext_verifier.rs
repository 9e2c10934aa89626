use chrono::{DateTime, Utc};

use crate::core::models::key_record::KeyRecord;
use crate::core::traits::cipher::CipherBackend;

/// A cleartext signature that checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCleartext {
    pub body: String,
    pub signer: KeyRecord,
}

/// Try each key in list order and stop at the first one that verifies.
///
/// Every key with public material is a candidate, secret half or not.
/// `None` means no key verified, which the caller treats as a reason to
/// try the encrypted path rather than as an error.
pub fn verify<C: CipherBackend + ?Sized>(
    cipher: &C,
    text: &str,
    keys: &[KeyRecord],
    at: DateTime<Utc>,
) -> Option<VerifiedCleartext> {
    keys.iter()
        .filter(|k| k.has_public_key)
        .find_map(|key| match cipher.verify_cleartext(text, key, at) {
            Ok(body) => Some(VerifiedCleartext {
                body,
                signer: key.clone(),
            }),
            Err(e) => {
                tracing::trace!(key = %key.long_identifier, error = %e, "cleartext signature not by this key");
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cipher::sequoia_backend::SequoiaBackend;
    use crate::adapters::cipher::sequoia_backend::testing::{key, public_only};

    #[test]
    fn finds_signer_among_public_keys() {
        let backend = SequoiaBackend::new();
        let alice = key("alice", None);
        let bob = key("bob", None);
        let signed = backend.clearsign("hello bob\n", &alice, None).unwrap();

        let keys = vec![bob.clone(), public_only(&alice)];
        let found = verify(&backend, &signed, &keys, Utc::now()).unwrap();

        assert_eq!(found.signer.long_identifier, alice.long_identifier);
        assert_eq!(found.body.trim_end(), "hello bob");
    }

    #[test]
    fn first_match_wins() {
        let backend = SequoiaBackend::new();
        let alice = key("alice", None);
        let signed = backend.clearsign("twice\n", &alice, None).unwrap();

        // The same key listed as a secret and as a public record.
        let public = public_only(&alice);
        let keys = vec![public.clone(), alice.clone()];
        let found = verify(&backend, &signed, &keys, Utc::now()).unwrap();

        assert!(!found.signer.has_secret_key);
        assert_eq!(found.signer, public);
    }

    #[test]
    fn unknown_signer_is_none() {
        let backend = SequoiaBackend::new();
        let alice = key("alice", None);
        let bob = key("bob", None);
        let signed = backend.clearsign("hello\n", &alice, None).unwrap();

        assert!(verify(&backend, &signed, &[bob], Utc::now()).is_none());
        assert!(verify(&backend, &signed, &[], Utc::now()).is_none());
    }

    #[test]
    fn signature_from_the_future_is_rejected() {
        let backend = SequoiaBackend::new();
        let alice = key("alice", None);
        let signed = backend.clearsign("hello\n", &alice, None).unwrap();

        let long_ago = Utc::now() - chrono::Duration::days(365);
        assert!(verify(&backend, &signed, &[alice], long_ago).is_none());
    }
}
