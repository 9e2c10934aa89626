use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::adapters::key_stores::file_key_store::FileKeyStore;
use crate::adapters::passphrase::env_store::EnvPassphraseStore;
use crate::adapters::passphrase::prompt_store::PromptPassphraseStore;
use crate::config::app_config::{AppConfig, PassphraseSource};
use crate::core::errors::{CipherpostError, Result};
use crate::core::traits::passphrase_store::PassphraseStore;

static HOME_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the global cipherpost home directory.
/// If `custom` is provided, uses that path; otherwise the platform
/// config directory.
pub fn init(custom: Option<&str>) {
    let dir = custom.map(PathBuf::from).unwrap_or_else(default_home);
    let _ = HOME_DIR.set(dir);
}

fn default_home() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("cipherpost"))
        .unwrap_or_else(|| PathBuf::from(".cipherpost"))
}

/// Get the current home directory path.
pub fn home_dir() -> &'static Path {
    HOME_DIR.get_or_init(default_home).as_path()
}

/// Load the configuration, failing when `init` has not run.
pub fn load_config() -> Result<AppConfig> {
    AppConfig::load(home_dir())
}

pub fn key_store() -> FileKeyStore {
    FileKeyStore::new(home_dir().join("keyring.json"))
}

/// Passphrase store selected by `[cipherpost] passphrase_source`.
pub fn passphrase_store(config: &AppConfig) -> Box<dyn PassphraseStore> {
    match config.cipherpost.passphrase_source {
        PassphraseSource::Env => {
            let store = EnvPassphraseStore::from_env();
            tracing::debug!(count = store.len(), "passphrases found in the environment");
            Box::new(store)
        }
        PassphraseSource::Prompt => Box::new(PromptPassphraseStore::terminal()),
    }
}

/// Read text from a file, or from stdin when no file is given.
pub fn read_input(file: Option<&str>) -> Result<String> {
    match file {
        Some("-") | None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(CipherpostError::FileNotFound { path });
            }
            Ok(std::fs::read_to_string(&path)?)
        }
    }
}
