// Wed Jan 15 2026 - Alex

pub mod cli;

pub use cli::{Args, Command, CommandHandler};

use colored::Colorize;

pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red(), message);
}
