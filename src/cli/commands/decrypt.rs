use std::thread;

use colored::Colorize;

use crate::adapters::cipher::sequoia_backend::SequoiaBackend;
use crate::cli::{context, output};
use crate::core::errors::{CipherpostError, Result};
use crate::core::models::decrypt_result::{DecryptResult, VerifyOutcome};
use crate::core::services::decrypt_service::{DecryptService, SharedResult};

/// Execute the `cipherpost decrypt` command.
///
/// With no files the message is read from stdin. Several files are
/// interpreted in parallel, at most `[interpret] max_parallel` at once;
/// identical payloads are decrypted only once.
pub fn execute(files: &[String], json: bool) -> Result<()> {
    let config = context::load_config()?;
    let service = DecryptService::new(
        SequoiaBackend::new(),
        context::key_store(),
        context::passphrase_store(&config),
    );

    if files.len() <= 1 {
        let text = context::read_input(files.first().map(|s| s.as_str()))?;
        let result = service.decrypt(&text)?;
        return print_result(None, &result, json);
    }

    let inputs = files
        .iter()
        .map(|f| context::read_input(Some(f)))
        .collect::<Result<Vec<_>>>()?;

    let service = &service;
    let spinner = output::spinner(&format!("Interpreting {} messages...", inputs.len()));
    let mut results: Vec<SharedResult> = Vec::with_capacity(inputs.len());
    for chunk in inputs.chunks(config.interpret.max_parallel) {
        let batch: Vec<SharedResult> = thread::scope(|s| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|text| s.spawn(move || service.decrypt_coalesced(text)))
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        std::sync::Arc::new(Err(CipherpostError::Internal {
                            detail: "interpreter thread panicked".into(),
                        }))
                    })
                })
                .collect()
        });
        results.extend(batch);
    }
    spinner.finish_and_clear();

    let mut failed = 0;
    for (file, result) in files.iter().zip(&results) {
        match result.as_ref() {
            Ok(r) => print_result(Some(file), r, json)?,
            Err(e) => {
                failed += 1;
                output::error(&format!("{file}: {e}"));
            }
        }
    }

    if failed > 0 {
        return Err(CipherpostError::SomeFailed {
            failed,
            total: files.len(),
        });
    }
    Ok(())
}

fn print_result(file: Option<&str>, result: &DecryptResult, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(result).map_err(|e| CipherpostError::Serialization {
                detail: e.to_string(),
            })?;
        println!("{rendered}");
        return Ok(());
    }

    if let Some(file) = file {
        output::header(file);
    }

    match &result.verify_result {
        VerifyOutcome::Valid => output::success(&signature_line(result)),
        VerifyOutcome::NoSignature => output::detail("Signature", "none"),
        VerifyOutcome::Invalid => output::error(&signature_line(result)),
        VerifyOutcome::UnknownSigner(_) => output::warning(&result.verify_result.to_string()),
    }

    for key in &result.recipient_keys {
        output::detail("Opened by", &key.to_string());
    }
    if !result.unknown_recipient_key_ids.is_empty() {
        output::detail(
            "Also to",
            &result
                .unknown_recipient_key_ids
                .join(", ")
                .dimmed()
                .to_string(),
        );
    }

    println!("{}", result.message);
    Ok(())
}

fn signature_line(result: &DecryptResult) -> String {
    match &result.signature_key {
        Some(key) => format!("{} from {key}", result.verify_result),
        None => result.verify_result.to_string(),
    }
}
