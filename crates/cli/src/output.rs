//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use annalist_common::TestStatus;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Per-story table with a totals line
    #[default]
    Table,
    /// Full aggregate as JSON
    Json,
    /// One `field: value` block per story
    Plain,
}

/// Empty table with the shared look and the given header
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.to_vec());
    table
}

/// Status label, coloured by how bad it is
pub fn status_label(status: TestStatus) -> String {
    let label = status.to_string();
    match status {
        TestStatus::Success => label.green().to_string(),
        TestStatus::Failure => label.red().bold().to_string(),
        TestStatus::Pending => label.yellow().to_string(),
        TestStatus::Skipped | TestStatus::Ignored => label.dimmed().to_string(),
        TestStatus::Running | TestStatus::NotStarted => label,
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "!".yellow(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label_keeps_status_text() {
        colored::control::set_override(false);
        assert_eq!(status_label(TestStatus::Failure), "failure");
        assert_eq!(status_label(TestStatus::NotStarted), "not started");
    }

    #[test]
    fn test_table_has_header() {
        let table = table(&["Story", "Tests"]);
        let rendered = table.to_string();
        assert!(rendered.contains("Story"));
        assert!(rendered.contains("Tests"));
    }
}
