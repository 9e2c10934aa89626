use colored::Colorize;
use secrecy::{ExposeSecret, SecretString};

use crate::adapters::cipher::sequoia_backend::SequoiaBackend;
use crate::adapters::key_stores::file_key_store::FileKeyStore;
use crate::adapters::passphrase::prompt_store::PromptPassphraseStore;
use crate::cli::KeysAction;
use crate::cli::{context, output};
use crate::core::errors::{CipherpostError, Result};
use crate::core::models::key_record::KeyRecord;
use crate::core::services::key_service::KeyService;
use crate::core::traits::passphrase_store::PassphraseStore;

/// Execute the `cipherpost keys` command.
pub fn execute(action: &KeysAction) -> Result<()> {
    context::load_config()?;
    let service = KeyService {
        cipher: SequoiaBackend::new(),
        store: context::key_store(),
    };

    match action {
        KeysAction::Generate {
            user_id,
            no_passphrase,
        } => execute_generate(&service, user_id, *no_passphrase),
        KeysAction::Import { file } => execute_import(&service, file),
        KeysAction::List => execute_list(&service),
        KeysAction::Remove { identity } => {
            let removed = service.remove_key(identity)?;
            output::success(&format!("Removed {removed}"));
            Ok(())
        }
        KeysAction::Export { identity, secret } => {
            let armored = service.export(identity, *secret)?;
            print!("{armored}");
            Ok(())
        }
    }
}

fn execute_generate(
    service: &KeyService<SequoiaBackend, FileKeyStore>,
    user_id: &str,
    no_passphrase: bool,
) -> Result<()> {
    let passphrase = if no_passphrase {
        None
    } else {
        Some(read_new_passphrase(&PromptPassphraseStore::terminal())?)
    };

    let spinner = output::spinner("Generating key...");
    let result = service.generate(user_id, passphrase.as_ref());
    spinner.finish_and_clear();
    let key = result?;

    output::success(&format!("Generated {key}"));
    output::detail("Fingerprint", &key.fingerprint);
    if let Some(id) = key.encryption_key_id() {
        output::detail("Encrypts to", id);
    }
    if key.locked {
        output::detail(
            "Passphrase",
            &format!("export CIPHERPOST_PASSPHRASE_{}=...", key.long_identifier),
        );
    }
    Ok(())
}

/// Ask twice and insist the answers agree.
fn read_new_passphrase<P: PassphraseStore>(prompt: &P) -> Result<SecretString> {
    let first = prompt
        .lookup("new key", "Passphrase for the new key")?
        .ok_or_else(|| CipherpostError::KeychainUnlockFail {
            key_id: "new key".into(),
        })?;
    let second = prompt
        .lookup("new key", "Repeat passphrase")?
        .ok_or_else(|| CipherpostError::KeychainUnlockFail {
            key_id: "new key".into(),
        })?;

    if first.expose_secret() != second.expose_secret() {
        return Err(CipherpostError::InvalidConfig {
            detail: "Passphrases do not match".into(),
        });
    }
    Ok(first)
}

fn execute_import(service: &KeyService<SequoiaBackend, FileKeyStore>, file: &str) -> Result<()> {
    let armored = context::read_input(Some(file))?;
    let key = service.import(&armored)?;

    let kind = if key.has_secret_key {
        "secret key"
    } else {
        "public key"
    };
    output::success(&format!("Imported {kind} {key}"));
    Ok(())
}

fn execute_list(service: &KeyService<SequoiaBackend, FileKeyStore>) -> Result<()> {
    let keys = service.list_keys()?;

    if keys.is_empty() {
        output::warning("Keyring is empty");
        eprintln!("  Run 'cipherpost keys generate <user-id>' or 'cipherpost keys import <file>'.");
        return Ok(());
    }

    output::header(&format!("Keys ({})", keys.len()));
    for key in &keys {
        println!("  {}", describe(key));
    }
    Ok(())
}

fn describe(key: &KeyRecord) -> String {
    let kind = if key.has_secret_key {
        "sec".green()
    } else {
        "pub".normal()
    };
    let lock = if key.locked { " [locked]" } else { "" };
    format!(
        "{kind}  {}  {}{}",
        key.long_identifier.bold(),
        key.user_id,
        lock.yellow()
    )
}
