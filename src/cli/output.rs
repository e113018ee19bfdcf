//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::domain::{Diagnostic, Member, Severity};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print failure status (red X, indented)
pub fn failure(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print labelled value (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data/export statements)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print one member line: id, then name and birth year
pub fn member(member: &Member) {
    println!("  {} {}", member.id.as_str().dimmed(), member);
}

/// Print a diagnostic, colored by severity
pub fn diagnostic(diagnostic: &Diagnostic) {
    match diagnostic.severity() {
        Severity::Warning => println!("  {} {}", "!".yellow(), diagnostic),
        Severity::Info => println!("  {} {}", "i".blue(), diagnostic),
    }
}
