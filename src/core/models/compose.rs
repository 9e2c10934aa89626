use super::key_record::KeyRecord;

/// A public key to encrypt to.
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
    pub key: &'a KeyRecord,
    /// Encrypt with a wildcard key ID so the message does not name this key.
    pub hidden: bool,
}

impl<'a> Recipient<'a> {
    pub fn visible(key: &'a KeyRecord) -> Self {
        Self { key, hidden: false }
    }

    pub fn hidden(key: &'a KeyRecord) -> Self {
        Self { key, hidden: true }
    }
}

/// Options that shape an encrypted message.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// When signing, also encrypt to the signer so the sender can read it back.
    pub encrypt_to_self: bool,
    /// Reason shown when the passphrase store has to ask the user.
    pub unlock_reason: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            encrypt_to_self: true,
            unlock_reason: "Unlock secret key to sign message".into(),
        }
    }
}
