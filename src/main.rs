use std::process::exit;

use colored::Colorize;

fn main() {
    if let Err(message) = vaultview::app::run_cli() {
        eprintln!(
            "{}{}{} {}",
            "[".bold().white(),
            "ERR".bold().red(),
            "]".bold().white(),
            message
        );
        exit(1);
    }
}
