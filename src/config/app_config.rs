use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::errors::{CipherpostError, Result};
use crate::core::models::compose::ComposeOptions;

/// Top-level Cipherpost configuration read from `<home>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub cipherpost: CipherpostSection,
    #[serde(default)]
    pub compose: ComposeSection,
    #[serde(default)]
    pub interpret: InterpretSection,
}

impl AppConfig {
    /// Load the configuration from `<home>/config.toml`.
    pub fn load(home: &Path) -> Result<Self> {
        let config_path = home.join("config.toml");
        if !config_path.exists() {
            return Err(CipherpostError::InvalidConfig {
                detail: format!(
                    "{} not found. Run 'cipherpost init' first.",
                    config_path.display()
                ),
            });
        }
        let content = std::fs::read_to_string(&config_path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| CipherpostError::InvalidConfig {
            detail: format!("Failed to parse config.toml: {e}"),
        })?;

        if config.cipherpost.format_version > CURRENT_FORMAT_VERSION {
            return Err(CipherpostError::FormatVersionTooNew {
                found: config.cipherpost.format_version,
                supported: CURRENT_FORMAT_VERSION,
            });
        }

        if config.interpret.max_parallel == 0 {
            return Err(CipherpostError::InvalidConfig {
                detail: "[interpret] max_parallel must be at least 1".into(),
            });
        }

        Ok(config)
    }

    /// Render as TOML for `cipherpost init`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CipherpostError::Serialization {
            detail: e.to_string(),
        })
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            encrypt_to_self: self.compose.encrypt_to_self,
            ..ComposeOptions::default()
        }
    }
}

/// Current format version supported by this build of Cipherpost.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Where passphrases for locked keys come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassphraseSource {
    /// `CIPHERPOST_PASSPHRASE_<KEY-ID>` variables.
    #[default]
    Env,
    /// Ask on the terminal.
    Prompt,
}

/// The `[cipherpost]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherpostSection {
    pub version: String,
    /// Format version for backward compatibility. Defaults to 1 if missing.
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    #[serde(default)]
    pub passphrase_source: PassphraseSource,
}

impl Default for CipherpostSection {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format_version: CURRENT_FORMAT_VERSION,
            passphrase_source: PassphraseSource::default(),
        }
    }
}

fn default_format_version() -> u32 {
    1
}

/// The `[compose]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeSection {
    /// Also encrypt to the signer so sent messages stay readable.
    #[serde(default = "default_true")]
    pub encrypt_to_self: bool,
}

impl Default for ComposeSection {
    fn default() -> Self {
        Self {
            encrypt_to_self: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// The `[interpret]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpretSection {
    /// Upper bound on messages interpreted at once.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

impl Default for InterpretSection {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
        }
    }
}

fn default_max_parallel() -> usize {
    4
}
