use crate::core::models::message::MessageKind;
use crate::core::traits::cipher::CipherBackend;

/// Tag a text blob as cleartext-signed, encrypted, or neither.
///
/// Format validation only: nothing is decrypted and no signature is
/// checked.
pub fn classify<C: CipherBackend + ?Sized>(cipher: &C, text: &str) -> MessageKind {
    let kind = cipher.classify(text);
    tracing::trace!(%kind, "classified payload");
    kind
}

/// Whether `text` looks like something worth interpreting.
pub fn is_likely_pgp<C: CipherBackend + ?Sized>(cipher: &C, text: &str) -> bool {
    classify(cipher, text).is_pgp()
}
