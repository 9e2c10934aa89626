use crate::adapters::cipher::sequoia_backend::SequoiaBackend;
use crate::cli::{context, output};
use crate::core::errors::{CipherpostError, Result};
use crate::core::services::classifier;

/// Execute the `cipherpost check` command.
///
/// Succeeds when the input looks like an OpenPGP message; needs no
/// keyring and no config.
pub fn execute(file: Option<&str>) -> Result<()> {
    let text = context::read_input(file)?;
    let backend = SequoiaBackend::new();

    if !classifier::is_likely_pgp(&backend, &text) {
        return Err(CipherpostError::BadPayload);
    }

    let kind = classifier::classify(&backend, &text);
    println!("{kind}");
    output::success("Looks like an OpenPGP message");
    Ok(())
}
