// Terminal helpers for messages that bypass the log subscriber.
use colored::Colorize;
use std::io::IsTerminal;

/// Whether stdout is an interactive terminal that can render colour.
pub fn stdout_is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

pub fn print_error(text: &str) {
    eprintln!("{} {}", "error:".red().bold(), text);
}
