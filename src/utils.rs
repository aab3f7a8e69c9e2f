use colored::Colorize;

use crate::eligibility::EligibilityStatus;

/// Format a CGPA with two decimals, or a dash while results are pending
pub fn format_cgpa(cgpa: Option<f64>) -> String {
    match cgpa {
        Some(value) => format!("{:.2}", value),
        None => "-".to_string(),
    }
}

/// Colour an eligibility status for terminal output
pub fn format_status(status: EligibilityStatus) -> String {
    let text = status.to_string();
    match status {
        EligibilityStatus::Eligible => text.green().to_string(),
        EligibilityStatus::NotEligible => text.red().to_string(),
        EligibilityStatus::PendingResults => text.yellow().to_string(),
    }
}

/// Format timestamp in human-readable format
pub fn format_timestamp(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Render a progress percentage as a fixed-width bar, e.g. `[###-------] 33%`
pub fn format_progress(percent: u32) -> String {
    let filled = (percent.min(100) / 10) as usize;
    format!("[{}{}] {}%", "#".repeat(filled), "-".repeat(10 - filled), percent)
}

/// Prompt user for yes/no confirmation
pub fn confirm_action(prompt: &str) -> std::io::Result<bool> {
    use std::io::{self, Write};

    print!("{} (y/N): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let mut row = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i < widths.len() {
            row.push_str(&format!("{:<width$}  ", col, width = widths[i]));
        }
    }
    println!("{}", row.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cgpa_formatting() {
        assert_eq!(format_cgpa(Some(3.0)), "3.00");
        assert_eq!(format_cgpa(Some(2.666)), "2.67");
        assert_eq!(format_cgpa(None), "-");
    }

    #[test]
    fn progress_bar() {
        assert_eq!(format_progress(0), "[----------] 0%");
        assert_eq!(format_progress(33), "[###-------] 33%");
        assert_eq!(format_progress(100), "[##########] 100%");
    }
}
