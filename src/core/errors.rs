use std::path::PathBuf;

/// All domain errors for Cipherpost.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum CipherpostError {
    #[error(
        "Bad payload: the text is not a recognized OpenPGP message\n\n  \
         Expected an armored block starting with\n    \
         -----BEGIN PGP MESSAGE----- or -----BEGIN PGP SIGNED MESSAGE-----"
    )]
    BadPayload,

    #[error(
        "None of your keys can open this message\n\n  \
         The message is not addressed to any secret key in your keyring,\n  \
         or the matching key is locked.\n\n  \
         Solutions:\n    \
         → Import the recipient's secret key: cipherpost keys import <file>\n    \
         → Provide its passphrase: CIPHERPOST_PASSPHRASE_<KEY-ID>\n    \
         → Check your keys: cipherpost keys list"
    )]
    NoAvailableDecryptKey,

    #[error(
        "Invalid signer: {reason}\n\n  \
         Signing needs a key with both public and secret material.\n  \
         Run 'cipherpost keys list' to see which keys carry a secret part."
    )]
    InvalidSigner { reason: String },

    #[error(
        "Could not unlock the secret key {key_id}\n\n  \
         The passphrase lookup failed or was cancelled."
    )]
    KeychainUnlockFail { key_id: String },

    #[error("Cannot encrypt: no recipients provided")]
    EmptyRecipients,

    #[error("Failed to compose message: {cause}")]
    ComposeFailed {
        #[source]
        cause: Box<CipherpostError>,
    },

    #[error("Internal error: {detail}")]
    Internal { detail: String },

    #[error("Wrong passphrase for key {key_id}")]
    UnlockFailed { key_id: String },

    #[error("OpenPGP operation failed: {reason}")]
    Crypto { reason: String },

    #[error(
        "Key '{identity}' not found in keyring\n\n  \
         Run 'cipherpost keys list' to see available keys."
    )]
    KeyNotFound { identity: String },

    #[error("Key '{identity}' already exists in keyring")]
    KeyAlreadyExists { identity: String },

    #[error(
        "File not found: {path}\n\n  \
         Check that the path is correct and the file exists."
    )]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error("Keyring serialization failed: {detail}")]
    Serialization { detail: String },

    #[error(
        "This keyring uses format version {found}, but your Cipherpost \
         only supports up to version {supported}.\n\n  \
         Update Cipherpost: cargo install cipherpost --force"
    )]
    FormatVersionTooNew { found: u32, supported: u32 },

    #[error("{failed} of {total} messages could not be interpreted")]
    SomeFailed { failed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CipherpostError {
    /// Wrap a library error raised while composing a message.
    pub fn compose(cause: CipherpostError) -> Self {
        Self::ComposeFailed {
            cause: Box::new(cause),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CipherpostError>;
