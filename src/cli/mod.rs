pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};

/// Read, verify and write OpenPGP messages against a local keyring.
#[derive(Parser, Debug)]
#[command(name = "cipherpost", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Cipherpost home directory (config and keyring)
    #[arg(long, global = true, env = "CIPHERPOST_HOME")]
    pub home: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the home directory, default config and an empty keyring
    Init,

    /// Manage keys in the local keyring
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Decrypt and verify messages (reads stdin when no file is given)
    #[command(alias = "interpret")]
    Decrypt {
        /// Files holding armored messages
        files: Vec<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encrypt a message, optionally signing it
    Encrypt {
        /// Recipient key (long ID, fingerprint or user ID). Repeatable.
        #[arg(long = "to")]
        to: Vec<String>,
        /// Recipient whose key ID is left out of the message. Repeatable.
        #[arg(long = "hidden-to")]
        hidden_to: Vec<String>,
        /// Sign with this secret key
        #[arg(long)]
        sign_with: Option<String>,
        /// Do not add the signer to the recipients
        #[arg(long)]
        no_self: bool,
        /// Plaintext file (default: stdin)
        file: Option<String>,
    },

    /// Produce a cleartext-signed message
    Sign {
        /// Secret key to sign with
        #[arg(long = "with")]
        with: String,
        /// Plaintext file (default: stdin)
        file: Option<String>,
    },

    /// Tell whether text looks like an OpenPGP message
    Check {
        /// File to inspect (default: stdin)
        file: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeysAction {
    /// Generate a new key pair
    Generate {
        /// User ID, e.g. "Alice <alice@example.org>"
        user_id: String,
        /// Leave the secret key unprotected
        #[arg(long)]
        no_passphrase: bool,
    },
    /// Import an armored key from a file
    Import {
        /// File holding the armored key
        file: String,
    },
    /// List keys in the keyring
    List,
    /// Remove a key
    Remove {
        /// Long ID, fingerprint or user ID
        identity: String,
    },
    /// Print a key in armored form
    Export {
        /// Long ID, fingerprint or user ID
        identity: String,
        /// Export the secret key instead of the public key
        #[arg(long)]
        secret: bool,
    },
}
