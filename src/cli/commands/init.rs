use crate::cli::{context, output};
use crate::config::app_config::AppConfig;
use crate::core::errors::{CipherpostError, Result};
use crate::core::traits::key_store::KeyStore;

/// Execute the `cipherpost init` command.
///
/// Creates the home directory with a default `config.toml` and an
/// empty keyring.
pub fn execute(verbose: bool) -> Result<()> {
    let home = context::home_dir();
    let config_path = home.join("config.toml");

    if config_path.exists() {
        return Err(CipherpostError::InvalidConfig {
            detail: format!(
                "Cipherpost is already initialized ({} exists)",
                config_path.display()
            ),
        });
    }

    output::header("Cipherpost: initializing");

    std::fs::create_dir_all(home)?;
    output::success(&format!("Created {}", home.display()));

    std::fs::write(&config_path, AppConfig::default().to_toml()?)?;
    output::success("Generated config.toml with defaults");

    let store = context::key_store();
    if !store.path().exists() {
        store.create()?;
        output::success("Created empty keyring.json");
    }

    eprintln!();
    eprintln!("  Next steps:");
    eprintln!("     1. Run 'cipherpost keys generate \"Your Name <you@example.org>\"'");
    eprintln!("     2. Import your contacts: cipherpost keys import <file>");
    eprintln!("     3. Paste a message into 'cipherpost decrypt'");

    if verbose {
        eprintln!();
        eprintln!("  Files created:");
        eprintln!("     config.toml    Cipherpost configuration");
        eprintln!("     keyring.json   Local keys (keep it private)");
    }

    // Touch the keyring once so a broken file shows up now.
    store.list()?;
    Ok(())
}
