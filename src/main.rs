mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};

/// Logs go to stderr so stdout stays clean for message text.
///
/// `CIPHERPOST_LOG` takes an env-filter directive; otherwise `--verbose`
/// turns on debug output for this crate and the default is warnings only.
fn init_tracing(verbose: bool) {
    let default = if verbose { "cipherpost=debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("CIPHERPOST_LOG")
        .unwrap_or_else(|_| default.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let args = Cli::parse();
    init_tracing(args.verbose);
    cli::context::init(args.home.as_deref());

    let result = match &args.command {
        Commands::Init => cli::commands::init::execute(args.verbose),
        Commands::Keys { action } => cli::commands::keys::execute(action),
        Commands::Decrypt { files, json } => cli::commands::decrypt::execute(files, *json),
        Commands::Encrypt {
            to,
            hidden_to,
            sign_with,
            no_self,
            file,
        } => cli::commands::encrypt::execute(
            to,
            hidden_to,
            sign_with.as_deref(),
            *no_self,
            file.as_deref(),
        ),
        Commands::Sign { with, file } => cli::commands::sign::execute(with, file.as_deref()),
        Commands::Check { file } => cli::commands::check::execute(file.as_deref()),
    };

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}
