use crate::adapters::cipher::sequoia_backend::SequoiaBackend;
use crate::cli::{context, output};
use crate::core::errors::Result;
use crate::core::services::compose_service::ComposeService;
use crate::core::traits::key_store::KeyStore;

/// Execute the `cipherpost sign` command.
pub fn execute(with: &str, file: Option<&str>) -> Result<()> {
    let config = context::load_config()?;
    let signer = context::key_store().get(with)?;

    let service = ComposeService {
        cipher: SequoiaBackend::new(),
        passphrases: context::passphrase_store(&config),
        options: config.compose_options(),
    };

    let plaintext = context::read_input(file)?;
    let signed = service.clearsign(&plaintext, &signer)?;

    print!("{signed}");
    output::success(&format!("Signed by {signer}"));
    Ok(())
}
