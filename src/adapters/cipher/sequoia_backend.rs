use std::io::{Read, Write};
use std::sync::LazyLock;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use sequoia_openpgp as openpgp;

use openpgp::cert::prelude::*;
use openpgp::crypto::{KeyPair, Password, SessionKey};
use openpgp::packet::{Key, PKESK, SKESK, key};
use openpgp::parse::stream::{
    DecryptionHelper, DecryptorBuilder, MessageLayer, MessageStructure, VerificationError,
    VerificationHelper, VerifierBuilder,
};
use openpgp::parse::{PacketParser, PacketParserResult, Parse};
use openpgp::policy::StandardPolicy;
use openpgp::serialize::SerializeInto;
use openpgp::serialize::stream::{
    Armorer, Encryptor2, LiteralWriter, Message, Recipient as PgpRecipient, Signer,
};
use openpgp::types::SymmetricAlgorithm;
use openpgp::{Fingerprint, KeyHandle, KeyID, Packet};

use crate::core::errors::{CipherpostError, Result};
use crate::core::models::compose::Recipient;
use crate::core::models::key_record::KeyRecord;
use crate::core::models::message::{Decrypted, MessageDetail, MessageKind, RecipientId};
use crate::core::traits::cipher::CipherBackend;

const POLICY: &StandardPolicy = &StandardPolicy::new();

static ARMOR_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-----BEGIN PGP (SIGNED )?MESSAGE-----\s*$").expect("armor header regex")
});

type SecretKey = Key<key::SecretParts, key::UnspecifiedRole>;

/// OpenPGP backend built on sequoia-openpgp.
///
/// Stateless: every call parses the key material it is handed, opens
/// secret keys with the passphrase given for that call, and drops the
/// decrypted material when the call returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequoiaBackend;

impl SequoiaBackend {
    pub fn new() -> Self {
        Self
    }
}

fn crypto_err(context: &str, e: impl std::fmt::Display) -> CipherpostError {
    CipherpostError::Crypto {
        reason: format!("{context}: {e:#}"),
    }
}

fn parse_cert(key: &KeyRecord) -> Result<Cert> {
    Cert::from_bytes(key.armored.as_bytes()).map_err(|e| {
        crypto_err(
            &format!("Invalid key material for {}", key.long_identifier),
            e,
        )
    })
}

fn keyid_hex(handle: &KeyHandle) -> String {
    match handle {
        KeyHandle::KeyID(id) => id.to_hex(),
        KeyHandle::Fingerprint(fp) => KeyID::from(fp.clone()).to_hex(),
    }
}

/// Open a secret key with `password` if its material is encrypted.
fn open_secret(key: SecretKey, password: Option<&Password>) -> Result<SecretKey> {
    if !key.secret().is_encrypted() {
        return Ok(key);
    }
    let key_id = key.keyid().to_hex();
    match password {
        Some(p) => key
            .decrypt_secret(p)
            .map_err(|_| CipherpostError::UnlockFailed { key_id }),
        None => Err(CipherpostError::UnlockFailed { key_id }),
    }
}

/// Encryption-capable secret subkeys that open with `passphrase`.
fn decryption_keys(cert: &Cert, passphrase: Option<&SecretString>) -> Vec<SecretKey> {
    let password = passphrase.map(|p| Password::from(p.expose_secret()));
    cert.keys()
        .secret()
        .with_policy(POLICY, None)
        .supported()
        .for_storage_encryption()
        .for_transport_encryption()
        .filter_map(|ka| match open_secret(ka.key().clone(), password.as_ref()) {
            Ok(k) => Some(k),
            Err(e) => {
                tracing::trace!(subkey = %ka.key().keyid(), error = %e, "subkey stays locked");
                None
            }
        })
        .collect()
}

fn signing_keypair(signer: &KeyRecord, passphrase: Option<&SecretString>) -> Result<KeyPair> {
    let cert = parse_cert(signer)?;
    let vc = cert
        .with_policy(POLICY, None)
        .map_err(|e| crypto_err(&format!("{} rejected by policy", signer.long_identifier), e))?;
    let password = passphrase.map(|p| Password::from(p.expose_secret()));

    let mut last_err = None;
    for ka in vc.keys().alive().revoked(false).for_signing().secret() {
        match open_secret(ka.key().clone(), password.as_ref()) {
            Ok(k) => {
                return k
                    .into_keypair()
                    .map_err(|e| crypto_err("Creating key pair from signing key", e));
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| CipherpostError::InvalidSigner {
        reason: format!("{} has no usable signing subkey", signer.long_identifier),
    }))
}

/// Drives sequoia's streaming decryptor and verifier.
///
/// Records every signature issuer it is asked about so callers learn
/// who signed even when no matching certificate is available.
struct StreamHelper {
    decryption_keys: Vec<SecretKey>,
    recipient: Option<Fingerprint>,
    signer: Option<Cert>,
    require_signature: bool,
    issuers: Vec<String>,
}

impl StreamHelper {
    fn new(decryption_keys: Vec<SecretKey>, recipient: Option<Fingerprint>) -> Self {
        Self {
            decryption_keys,
            recipient,
            signer: None,
            require_signature: false,
            issuers: Vec::new(),
        }
    }

    fn verifying(mut self, signer: Cert) -> Self {
        self.signer = Some(signer);
        self.require_signature = true;
        self
    }
}

impl VerificationHelper for StreamHelper {
    fn get_certs(&mut self, ids: &[KeyHandle]) -> openpgp::Result<Vec<Cert>> {
        for id in ids {
            let hex = keyid_hex(id);
            if !self.issuers.contains(&hex) {
                self.issuers.push(hex);
            }
        }
        Ok(self.signer.iter().cloned().collect())
    }

    fn check(&mut self, structure: MessageStructure) -> openpgp::Result<()> {
        if !self.require_signature {
            return Ok(());
        }

        let mut good = 0usize;
        let mut bad = 0usize;
        for layer in structure.into_iter() {
            if let MessageLayer::SignatureGroup { results } = layer {
                for result in results {
                    match result {
                        Ok(_) => good += 1,
                        // Signatures by other keys are not our concern.
                        Err(VerificationError::MissingKey { .. }) => {}
                        Err(_) => bad += 1,
                    }
                }
            }
        }

        if good > 0 && bad == 0 {
            Ok(())
        } else {
            Err(openpgp::Error::BadSignature(format!(
                "{good} good and {bad} bad signature(s) from the expected signer"
            ))
            .into())
        }
    }
}

impl DecryptionHelper for StreamHelper {
    fn decrypt<D>(
        &mut self,
        pkesks: &[PKESK],
        _skesks: &[SKESK],
        sym_algo: Option<SymmetricAlgorithm>,
        mut decrypt: D,
    ) -> openpgp::Result<Option<Fingerprint>>
    where
        D: FnMut(SymmetricAlgorithm, &SessionKey) -> bool,
    {
        for pkesk in pkesks {
            let target = pkesk.recipient();
            for key in &self.decryption_keys {
                if !target.is_wildcard() && *target != key.keyid() {
                    continue;
                }
                let mut pair = match key.clone().into_keypair() {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::trace!(subkey = %key.keyid(), error = %e, "no key pair");
                        continue;
                    }
                };
                if pkesk
                    .decrypt(&mut pair, sym_algo)
                    .map(|(algo, session_key)| decrypt(algo, &session_key))
                    .unwrap_or(false)
                {
                    return Ok(self.recipient.clone());
                }
            }
        }

        Err(openpgp::Error::MissingSessionKey("no matching secret key".into()).into())
    }
}

/// Check the framing of a cleartext-signed message.
///
/// Only the verifier's armor reader understands the cleartext signature
/// framework, so the text is streamed through it with no certificates:
/// signatures come back as missing keys and the helper accepts that.
fn cleartext_parses(text: &str) -> bool {
    let helper = StreamHelper::new(Vec::new(), None);
    let verifier = VerifierBuilder::from_bytes(text.as_bytes())
        .and_then(|b| b.with_policy(POLICY, None, helper));
    match verifier {
        Ok(mut v) => std::io::copy(&mut v, &mut std::io::sink()).is_ok(),
        Err(e) => {
            tracing::trace!(error = %e, "cleartext framing rejected");
            false
        }
    }
}

impl SequoiaBackend {
    fn run_decryptor(
        &self,
        armored: &str,
        key: &KeyRecord,
        passphrase: Option<&SecretString>,
        signer: Option<&KeyRecord>,
    ) -> Result<Decrypted> {
        let cert = parse_cert(key)?;
        let keys = decryption_keys(&cert, passphrase);
        if keys.is_empty() {
            return Err(CipherpostError::Crypto {
                reason: format!("{} has no usable decryption subkey", key.long_identifier),
            });
        }

        let mut helper = StreamHelper::new(keys, Some(cert.fingerprint()));
        if let Some(signer) = signer {
            helper = helper.verifying(parse_cert(signer)?);
        }

        let mut decryptor = DecryptorBuilder::from_bytes(armored.as_bytes())
            .map_err(|e| crypto_err("Reading message", e))?
            .with_policy(POLICY, None, helper)
            .map_err(|e| crypto_err("Decryption failed", e))?;

        let mut plaintext = Vec::new();
        decryptor
            .read_to_end(&mut plaintext)
            .map_err(|e| crypto_err("Decryption failed", e))?;

        let helper = decryptor.into_helper();
        Ok(Decrypted {
            plaintext,
            signer_ids: helper.issuers,
        })
    }
}

impl CipherBackend for SequoiaBackend {
    fn inspect_key(&self, armored: &str) -> Result<KeyRecord> {
        let cert = Cert::from_bytes(armored.as_bytes())
            .map_err(|e| crypto_err("Invalid key material", e))?;

        let user_id = cert
            .userids()
            .next()
            .map(|ua| String::from_utf8_lossy(ua.userid().value()).into_owned())
            .unwrap_or_default();

        let encryption_key_ids = match cert.with_policy(POLICY, None) {
            Ok(vc) => vc
                .keys()
                .supported()
                .revoked(false)
                .for_storage_encryption()
                .for_transport_encryption()
                .map(|ka| ka.key().keyid().to_hex())
                .collect(),
            Err(e) => {
                tracing::debug!(key = %cert.keyid(), error = %e, "certificate rejected by policy");
                Vec::new()
            }
        };

        let has_secret_key = cert.is_tsk();
        let serialized = if has_secret_key {
            cert.as_tsk().armored().to_vec()
        } else {
            cert.armored().to_vec()
        }
        .map_err(|e| crypto_err("Serializing key", e))?;

        Ok(KeyRecord {
            long_identifier: cert.keyid().to_hex(),
            fingerprint: cert.fingerprint().to_hex(),
            user_id,
            has_public_key: true,
            has_secret_key,
            encryption_key_ids,
            key_ids: cert.keys().map(|ka| ka.key().keyid().to_hex()).collect(),
            locked: cert.keys().secret().any(|ka| ka.key().secret().is_encrypted()),
            created_at: Some(DateTime::<Utc>::from(
                cert.primary_key().key().creation_time(),
            )),
            armored: String::from_utf8_lossy(&serialized).into_owned(),
        })
    }

    fn export_public(&self, key: &KeyRecord) -> Result<String> {
        let cert = parse_cert(key)?;
        let armored = cert
            .strip_secret_key_material()
            .armored()
            .to_vec()
            .map_err(|e| crypto_err("Serializing key", e))?;
        Ok(String::from_utf8_lossy(&armored).into_owned())
    }

    fn generate_key(&self, user_id: &str, passphrase: Option<&SecretString>) -> Result<String> {
        let mut builder = CertBuilder::general_purpose(None, Some(user_id));
        if let Some(p) = passphrase {
            builder = builder.set_password(Some(Password::from(p.expose_secret())));
        }
        let (cert, _revocation) = builder
            .generate()
            .map_err(|e| crypto_err("Key generation failed", e))?;

        let armored = cert
            .as_tsk()
            .armored()
            .to_vec()
            .map_err(|e| crypto_err("Serializing key", e))?;
        Ok(String::from_utf8_lossy(&armored).into_owned())
    }

    fn classify(&self, text: &str) -> MessageKind {
        let trimmed = text.trim();
        let Some(header) = trimmed.lines().next() else {
            return MessageKind::Unrecognized;
        };
        let Some(caps) = ARMOR_HEADER.captures(header) else {
            return MessageKind::Unrecognized;
        };

        if caps.get(1).is_some() {
            if cleartext_parses(trimmed) {
                MessageKind::Cleartext
            } else {
                MessageKind::Unrecognized
            }
        } else if openpgp::Message::from_bytes(trimmed.as_bytes()).is_ok() {
            MessageKind::Encrypted
        } else {
            MessageKind::Unrecognized
        }
    }

    fn verify_cleartext(
        &self,
        text: &str,
        signer: &KeyRecord,
        at: DateTime<Utc>,
    ) -> Result<String> {
        let helper = StreamHelper::new(Vec::new(), None).verifying(parse_cert(signer)?);

        let mut verifier = VerifierBuilder::from_bytes(text.trim().as_bytes())
            .map_err(|e| crypto_err("Reading signed message", e))?
            .with_policy(POLICY, SystemTime::from(at), helper)
            .map_err(|e| crypto_err("Signature verification failed", e))?;

        let mut body = Vec::new();
        verifier
            .read_to_end(&mut body)
            .map_err(|e| crypto_err("Signature verification failed", e))?;

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn unlock(&self, key: &KeyRecord, passphrase: &SecretString) -> Result<()> {
        let cert = parse_cert(key)?;
        let password = Password::from(passphrase.expose_secret());

        let mut opened = 0usize;
        for ka in cert.keys().secret() {
            open_secret(ka.key().clone(), Some(&password)).map_err(|_| {
                CipherpostError::UnlockFailed {
                    key_id: key.long_identifier.clone(),
                }
            })?;
            opened += 1;
        }

        if opened == 0 {
            return Err(CipherpostError::UnlockFailed {
                key_id: key.long_identifier.clone(),
            });
        }
        Ok(())
    }

    fn message_detail(
        &self,
        armored: &str,
        key: &KeyRecord,
        passphrase: Option<&SecretString>,
    ) -> Result<MessageDetail> {
        let cert = parse_cert(key)?;
        let keys = decryption_keys(&cert, passphrase);

        let mut detail = MessageDetail::default();
        let mut session: Option<(SymmetricAlgorithm, SessionKey)> = None;
        let mut position = 0usize;
        let mut opened = false;

        let mut ppr = PacketParser::from_bytes(armored.as_bytes())
            .map_err(|e| crypto_err("Reading message", e))?;

        while let PacketParserResult::Some(mut pp) = ppr {
            let mut open_container = false;
            match &pp.packet {
                Packet::PKESK(pkesk) => {
                    let target = pkesk.recipient();
                    if target.is_wildcard() {
                        detail.encrypted_to.push(RecipientId::Hidden(position));
                    } else {
                        detail.encrypted_to.push(RecipientId::Known(target.to_hex()));
                    }
                    if session.is_none() {
                        session = keys
                            .iter()
                            .filter(|k| target.is_wildcard() || k.keyid() == *target)
                            .find_map(|k| {
                                let mut pair = k.clone().into_keypair().ok()?;
                                pkesk.decrypt(&mut pair, None)
                            });
                    }
                    position += 1;
                }
                Packet::SEIP(_) => open_container = session.is_some(),
                Packet::OnePassSig(ops) => {
                    detail.is_signed = true;
                    if detail.signed_by_key_id.is_none() {
                        detail.signed_by_key_id = Some(ops.issuer().to_hex());
                    }
                }
                Packet::Signature(sig) => {
                    detail.is_signed = true;
                    if detail.signed_by_key_id.is_none() {
                        detail.signed_by_key_id = sig.get_issuers().first().map(keyid_hex);
                    }
                }
                _ => {}
            }

            if open_container {
                if let Some((algo, session_key)) = &session {
                    opened = pp.decrypt(*algo, session_key).is_ok();
                }
            }

            match pp.recurse() {
                Ok((_, next)) => ppr = next,
                // Metadata is already collected; a damaged body is the
                // decryptor's problem, not the probe's.
                Err(e) if opened => {
                    tracing::debug!(key = %key.long_identifier, error = %e, "stopped inside container");
                    break;
                }
                Err(e) => return Err(crypto_err("Parsing message", e)),
            }
        }

        Ok(detail)
    }

    fn decrypt(
        &self,
        armored: &str,
        key: &KeyRecord,
        passphrase: Option<&SecretString>,
    ) -> Result<Decrypted> {
        self.run_decryptor(armored, key, passphrase, None)
    }

    fn decrypt_verify(
        &self,
        armored: &str,
        key: &KeyRecord,
        passphrase: Option<&SecretString>,
        signer: &KeyRecord,
    ) -> Result<Decrypted> {
        self.run_decryptor(armored, key, passphrase, Some(signer))
    }

    fn encrypt(
        &self,
        plaintext: &str,
        recipients: &[Recipient<'_>],
        signer: Option<(&KeyRecord, Option<&SecretString>)>,
    ) -> Result<String> {
        if recipients.is_empty() {
            return Err(CipherpostError::EmptyRecipients);
        }

        // Left fold over the recipient list into one set of subkeys.
        let mut targets: Vec<(bool, Key<key::PublicParts, key::UnspecifiedRole>)> = Vec::new();
        for r in recipients {
            let cert = parse_cert(r.key)?;
            let vc = cert.with_policy(POLICY, None).map_err(|e| {
                crypto_err(&format!("{} rejected by policy", r.key.long_identifier), e)
            })?;

            let before = targets.len();
            for ka in vc
                .keys()
                .supported()
                .alive()
                .revoked(false)
                .for_transport_encryption()
                .for_storage_encryption()
            {
                targets.push((r.hidden, ka.key().clone()));
            }
            if targets.len() == before {
                return Err(CipherpostError::Crypto {
                    reason: format!(
                        "{} has no valid encryption-capable subkey",
                        r.key.long_identifier
                    ),
                });
            }
        }

        let signing = match signer {
            Some((key, passphrase)) => Some(signing_keypair(key, passphrase)?),
            None => None,
        };

        let pgp_recipients: Vec<PgpRecipient> = targets
            .iter()
            .map(|(hidden, key)| {
                let keyid = if *hidden { KeyID::wildcard() } else { key.keyid() };
                PgpRecipient::new(keyid, key)
            })
            .collect();

        let mut sink = Vec::new();
        let message = Message::new(&mut sink);
        let message = Armorer::new(message)
            .build()
            .map_err(|e| crypto_err("Setting up armorer", e))?;
        let mut message = Encryptor2::for_recipients(message, pgp_recipients)
            .build()
            .map_err(|e| crypto_err("Setting up encryptor", e))?;
        if let Some(pair) = signing {
            message = Signer::new(message, pair)
                .build()
                .map_err(|e| crypto_err("Setting up signer", e))?;
        }
        let mut message = LiteralWriter::new(message)
            .build()
            .map_err(|e| crypto_err("Setting up literal writer", e))?;
        message
            .write_all(plaintext.as_bytes())
            .map_err(|e| crypto_err("Encrypting message", e))?;
        message
            .finalize()
            .map_err(|e| crypto_err("Finalizing message", e))?;

        String::from_utf8(sink).map_err(|e| CipherpostError::Internal {
            detail: format!("Armored output is not UTF-8: {e}"),
        })
    }

    fn clearsign(
        &self,
        plaintext: &str,
        signer: &KeyRecord,
        passphrase: Option<&SecretString>,
    ) -> Result<String> {
        let pair = signing_keypair(signer, passphrase)?;

        let mut sink = Vec::new();
        let message = Message::new(&mut sink);
        let mut message = Signer::new(message, pair)
            .cleartext()
            .build()
            .map_err(|e| crypto_err("Setting up signer", e))?;
        message
            .write_all(plaintext.as_bytes())
            .map_err(|e| crypto_err("Signing message", e))?;
        message
            .finalize()
            .map_err(|e| crypto_err("Finalizing message", e))?;

        String::from_utf8(sink).map_err(|e| CipherpostError::Internal {
            detail: format!("Signed output is not UTF-8: {e}"),
        })
    }

    fn name(&self) -> &str {
        "sequoia"
    }
}
