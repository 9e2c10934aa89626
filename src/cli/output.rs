use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

// Status lines go to stderr; stdout carries message text only.

/// Print a success message.
pub fn success(msg: &str) {
    eprintln!("  {} {}", "✓".green(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    eprintln!("  {} {}", "⚠".yellow(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print a header line.
pub fn header(msg: &str) {
    eprintln!("\n{}", msg.bold());
}

/// Print an aligned `label: value` line.
pub fn detail(label: &str, value: &str) {
    eprintln!("  {:<12} {}", format!("{label}:").dimmed(), value);
}

/// Spinner on stderr; hidden automatically when stderr is not a terminal.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
