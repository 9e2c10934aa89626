use crate::adapters::cipher::sequoia_backend::SequoiaBackend;
use crate::cli::{context, output};
use crate::core::errors::Result;
use crate::core::models::compose::Recipient;
use crate::core::models::key_record::KeyRecord;
use crate::core::services::compose_service::ComposeService;
use crate::core::traits::key_store::KeyStore;

/// Execute the `cipherpost encrypt` command.
///
/// Reads plaintext from `file` or stdin and prints the armored message.
pub fn execute(
    to: &[String],
    hidden_to: &[String],
    sign_with: Option<&str>,
    no_self: bool,
    file: Option<&str>,
) -> Result<()> {
    let config = context::load_config()?;
    let store = context::key_store();

    let visible = resolve_all(&store, to)?;
    let hidden = resolve_all(&store, hidden_to)?;
    let signer = sign_with.map(|s| store.get(s)).transpose()?;

    let recipients: Vec<Recipient<'_>> = visible
        .iter()
        .map(Recipient::visible)
        .chain(hidden.iter().map(Recipient::hidden))
        .collect();

    let mut options = config.compose_options();
    if no_self {
        options.encrypt_to_self = false;
    }
    let service = ComposeService {
        cipher: SequoiaBackend::new(),
        passphrases: context::passphrase_store(&config),
        options,
    };

    let plaintext = context::read_input(file)?;
    let armored = service.encrypt(&plaintext, signer.as_ref(), &recipients)?;

    print!("{armored}");
    output::success(&format!(
        "Encrypted for {} recipient(s){}",
        recipients.len(),
        signer
            .as_ref()
            .map(|s| format!(", signed by {s}"))
            .unwrap_or_default()
    ));
    Ok(())
}

fn resolve_all<K: KeyStore>(store: &K, selectors: &[String]) -> Result<Vec<KeyRecord>> {
    selectors.iter().map(|s| store.get(s)).collect()
}
