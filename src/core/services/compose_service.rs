use secrecy::SecretString;

use crate::core::errors::{CipherpostError, Result};
use crate::core::models::compose::{ComposeOptions, Recipient};
use crate::core::models::key_record::KeyRecord;
use crate::core::traits::cipher::CipherBackend;
use crate::core::traits::passphrase_store::PassphraseStore;

/// Builds outgoing messages: encrypted (optionally signed) or clearsigned.
pub struct ComposeService<C: CipherBackend, P: PassphraseStore> {
    pub cipher: C,
    pub passphrases: P,
    pub options: ComposeOptions,
}

impl<C: CipherBackend, P: PassphraseStore> ComposeService<C, P> {
    /// Encrypt `plaintext` to every recipient, signing with `signer` if given.
    ///
    /// All validation happens before any cryptographic call: recipients
    /// must be non-empty, the signer must hold both halves and its
    /// passphrase must be retrievable.
    pub fn encrypt(
        &self,
        plaintext: &str,
        signer: Option<&KeyRecord>,
        recipients: &[Recipient<'_>],
    ) -> Result<String> {
        if recipients.is_empty() {
            return Err(CipherpostError::EmptyRecipients);
        }

        let signing = match signer {
            Some(key) => Some((key, self.signing_passphrase(key)?)),
            None => None,
        };

        let mut all: Vec<Recipient<'_>> = recipients.to_vec();
        if let Some((key, _)) = &signing {
            let present = all.iter().any(|r| r.key.fingerprint == key.fingerprint);
            if self.options.encrypt_to_self && !present {
                tracing::debug!(signer = %key.long_identifier, "adding signer to recipients");
                all.push(Recipient::visible(key));
            }
        }

        self.cipher
            .encrypt(
                plaintext,
                &all,
                signing.as_ref().map(|(key, pass)| (*key, pass.as_ref())),
            )
            .map_err(CipherpostError::compose)
    }

    /// Produce a cleartext-signed message.
    pub fn clearsign(&self, plaintext: &str, signer: &KeyRecord) -> Result<String> {
        let passphrase = self.signing_passphrase(signer)?;

        self.cipher
            .clearsign(plaintext, signer, passphrase.as_ref())
            .map_err(|e| {
                tracing::error!(signer = %signer.long_identifier, error = %e, "clearsign failed");
                CipherpostError::InvalidSigner {
                    reason: e.to_string(),
                }
            })
    }

    /// Check that `signer` can sign and fetch its passphrase if it is locked.
    ///
    /// The passphrase store is only consulted for locked keys; an
    /// unprotected signer returns `Ok(None)` without a lookup.
    fn signing_passphrase(&self, signer: &KeyRecord) -> Result<Option<SecretString>> {
        if !signer.can_sign() {
            return Err(CipherpostError::InvalidSigner {
                reason: format!("{signer} has no secret key"),
            });
        }
        if !signer.locked {
            return Ok(None);
        }

        let unlock_fail = || CipherpostError::KeychainUnlockFail {
            key_id: signer.long_identifier.clone(),
        };
        match self
            .passphrases
            .lookup(&signer.long_identifier, &self.options.unlock_reason)
        {
            Ok(Some(passphrase)) => Ok(Some(passphrase)),
            Ok(None) => Err(unlock_fail()),
            Err(e) => {
                tracing::warn!(signer = %signer.long_identifier, error = %e, "passphrase lookup failed");
                Err(unlock_fail())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::adapters::cipher::sequoia_backend::SequoiaBackend;
    use crate::adapters::cipher::sequoia_backend::testing::{key, public_only};
    use crate::adapters::passphrase::memory_store::MemoryPassphraseStore;
    use crate::core::models::message::{Decrypted, MessageDetail, MessageKind};

    /// Delegates to sequoia and counts every call.
    #[derive(Default)]
    struct Counting {
        inner: SequoiaBackend,
        calls: AtomicUsize,
    }

    impl Counting {
        fn tick(&self) -> &SequoiaBackend {
            self.calls.fetch_add(1, Ordering::SeqCst);
            &self.inner
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CipherBackend for Counting {
        fn inspect_key(&self, armored: &str) -> Result<KeyRecord> {
            self.tick().inspect_key(armored)
        }
        fn export_public(&self, key: &KeyRecord) -> Result<String> {
            self.tick().export_public(key)
        }
        fn generate_key(&self, user_id: &str, pass: Option<&SecretString>) -> Result<String> {
            self.tick().generate_key(user_id, pass)
        }
        fn classify(&self, text: &str) -> MessageKind {
            self.tick().classify(text)
        }
        fn verify_cleartext(&self, text: &str, signer: &KeyRecord, at: DateTime<Utc>) -> Result<String> {
            self.tick().verify_cleartext(text, signer, at)
        }
        fn unlock(&self, key: &KeyRecord, pass: &SecretString) -> Result<()> {
            self.tick().unlock(key, pass)
        }
        fn message_detail(&self, armored: &str, key: &KeyRecord, pass: Option<&SecretString>) -> Result<MessageDetail> {
            self.tick().message_detail(armored, key, pass)
        }
        fn decrypt(&self, armored: &str, key: &KeyRecord, pass: Option<&SecretString>) -> Result<Decrypted> {
            self.tick().decrypt(armored, key, pass)
        }
        fn decrypt_verify(
            &self,
            armored: &str,
            key: &KeyRecord,
            pass: Option<&SecretString>,
            signer: &KeyRecord,
        ) -> Result<Decrypted> {
            self.tick().decrypt_verify(armored, key, pass, signer)
        }
        fn encrypt(
            &self,
            plaintext: &str,
            recipients: &[Recipient<'_>],
            signer: Option<(&KeyRecord, Option<&SecretString>)>,
        ) -> Result<String> {
            self.tick().encrypt(plaintext, recipients, signer)
        }
        fn clearsign(&self, plaintext: &str, signer: &KeyRecord, pass: Option<&SecretString>) -> Result<String> {
            self.tick().clearsign(plaintext, signer, pass)
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    fn service(passphrases: MemoryPassphraseStore) -> ComposeService<Counting, MemoryPassphraseStore> {
        ComposeService {
            cipher: Counting::default(),
            passphrases,
            options: ComposeOptions::default(),
        }
    }

    #[test]
    fn empty_recipients_fail_before_any_crypto() {
        let alice = key("alice", Some("pw"));
        let svc = service(MemoryPassphraseStore::new().with(&alice.long_identifier, "pw"));

        let err = svc.encrypt("hello", Some(&alice), &[]).unwrap_err();

        assert!(matches!(err, CipherpostError::EmptyRecipients));
        assert_eq!(svc.cipher.calls(), 0);
        assert!(svc.passphrases.lookups().is_empty());
    }

    #[test]
    fn public_only_signer_is_invalid() {
        let alice = key("alice", None);
        let bob = key("bob", None);
        let svc = service(MemoryPassphraseStore::new());

        let err = svc
            .encrypt("hello", Some(&public_only(&alice)), &[Recipient::visible(&bob)])
            .unwrap_err();

        assert!(matches!(err, CipherpostError::InvalidSigner { .. }));
        assert_eq!(svc.cipher.calls(), 0);
    }

    #[test]
    fn missing_passphrase_fails_before_crypto() {
        let alice = key("alice", Some("pw"));
        let bob = key("bob", None);
        let svc = service(MemoryPassphraseStore::new().failing(&alice.long_identifier));

        let err = svc
            .encrypt("hello", Some(&alice), &[Recipient::visible(&bob)])
            .unwrap_err();
        assert!(matches!(err, CipherpostError::KeychainUnlockFail { .. }));

        let svc = service(MemoryPassphraseStore::new());
        let err = svc.clearsign("hello", &alice).unwrap_err();
        assert!(matches!(err, CipherpostError::KeychainUnlockFail { .. }));
        assert_eq!(svc.cipher.calls(), 0);
    }

    #[test]
    fn signed_message_is_readable_by_recipient_and_sender() {
        let alice = key("alice", Some("pw"));
        let bob = key("bob", None);
        let svc = service(MemoryPassphraseStore::new().with(&alice.long_identifier, "pw"));

        let armored = svc
            .encrypt("hi bob", Some(&alice), &[Recipient::visible(&public_only(&bob))])
            .unwrap();
        assert_eq!(svc.cipher.calls(), 1);

        let backend = SequoiaBackend::new();
        let for_bob = backend.decrypt_verify(&armored, &bob, None, &alice).unwrap();
        assert_eq!(for_bob.plaintext, b"hi bob");

        let pw = SecretString::from("pw".to_string());
        let for_alice = backend.decrypt(&armored, &alice, Some(&pw)).unwrap();
        assert_eq!(for_alice.plaintext, b"hi bob");
    }

    #[test]
    fn encrypt_to_self_can_be_disabled() {
        let alice = key("alice", None);
        let bob = key("bob", None);
        let mut svc = service(MemoryPassphraseStore::new());
        svc.options.encrypt_to_self = false;

        let armored = svc
            .encrypt("bob only", Some(&alice), &[Recipient::visible(&bob)])
            .unwrap();

        let backend = SequoiaBackend::new();
        assert!(backend.decrypt(&armored, &alice, None).is_err());
        assert!(backend.decrypt(&armored, &bob, None).is_ok());
    }

    #[test]
    fn signer_already_a_recipient_is_not_added_twice() {
        let alice = key("alice", None);
        let svc = service(MemoryPassphraseStore::new());

        let armored = svc
            .encrypt("note to self", Some(&alice), &[Recipient::visible(&alice)])
            .unwrap();

        let detail = SequoiaBackend::new()
            .message_detail(&armored, &alice, None)
            .unwrap();
        assert_eq!(detail.encrypted_to.len(), 1);
    }

    #[test]
    fn unprotected_signer_skips_passphrase_store() {
        let alice = key("alice", None);
        let bob = key("bob", None);
        let svc = service(MemoryPassphraseStore::new());

        svc.encrypt("hi", Some(&alice), &[Recipient::visible(&bob)])
            .unwrap();
        svc.clearsign("hi", &alice).unwrap();

        assert!(svc.passphrases.lookups().is_empty());
    }

    #[test]
    fn unsigned_encrypt_skips_passphrase_store() {
        let bob = key("bob", None);
        let svc = service(MemoryPassphraseStore::new());

        let armored = svc
            .encrypt("anon", None, &[Recipient::hidden(&bob)])
            .unwrap();

        assert!(armored.contains("BEGIN PGP MESSAGE"));
        assert!(svc.passphrases.lookups().is_empty());
    }

    #[test]
    fn crypto_failure_is_wrapped() {
        let bob = key("bob", None);
        let mut broken = public_only(&bob);
        broken.armored = "not a key".into();
        let svc = service(MemoryPassphraseStore::new());

        let err = svc
            .encrypt("x", None, &[Recipient::visible(&broken)])
            .unwrap_err();
        assert!(matches!(err, CipherpostError::ComposeFailed { .. }));
    }

    #[test]
    fn clearsign_round_trip() {
        let alice = key("alice", Some("pw"));
        let svc = service(MemoryPassphraseStore::new().with(&alice.long_identifier, "pw"));

        let signed = svc.clearsign("on the record\n", &alice).unwrap();
        assert!(signed.contains("BEGIN PGP SIGNATURE"));

        let body = SequoiaBackend::new()
            .verify_cleartext(&signed, &public_only(&alice), Utc::now())
            .unwrap();
        assert_eq!(body.trim_end(), "on the record");
    }

    #[test]
    fn clearsign_with_wrong_passphrase_is_invalid_signer() {
        let alice = key("alice", Some("pw"));
        let svc = service(MemoryPassphraseStore::new().with(&alice.long_identifier, "nope"));

        let err = svc.clearsign("x", &alice).unwrap_err();
        assert!(matches!(err, CipherpostError::InvalidSigner { .. }));
    }
}
