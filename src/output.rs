//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored messages,
//! the transfer progress bar, the per-extension summary table, and the JSON
//! run report.

use crate::file_organizer::{ExtensionCounts, FileFailure, OrganizeReport, Transfer};
use crate::transfer::TransferMode;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};
use std::path::Path;

/// Label shown for files without an extension.
const NO_EXTENSION: &str = "(none)";

fn extension_label(extension: &str) -> &str {
    if extension.is_empty() {
        NO_EXTENSION
    } else {
        extension
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use smartfile::output::OutputFormatter;
    /// OutputFormatter::success("Files organized");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        println!("{}", Self::error_line(message));
    }

    /// The line printed by [`OutputFormatter::error`].
    pub fn error_line(message: &str) -> String {
        format!("{} {}", "✗".red(), message)
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for `total` transfers.
    ///
    /// A hidden bar is returned when `visible` is false, so callers can drive
    /// it unconditionally.
    pub fn create_progress_bar(total: u64, visible: bool) -> ProgressBar {
        if !visible {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// One line describing a completed transfer.
    pub fn transfer_line(transfer: &Transfer, mode: TransferMode) -> String {
        format!(
            "{} {} {} {}",
            "✓".green(),
            mode.past_tense(),
            transfer.source.display(),
            format!("→ {}", transfer.destination.display()).dimmed()
        )
    }

    /// One line describing a planned transfer in a dry run.
    pub fn preview_line(transfer: &Transfer, mode: TransferMode) -> String {
        format!(
            " - {} {}",
            transfer.source.display(),
            format!("→ would {} to {}", mode.verb(), transfer.destination.display()).yellow()
        )
    }

    /// One line describing a file that could not be organized.
    pub fn failure_line(failure: &FileFailure) -> String {
        format!(
            "{} Error organizing file {}: {}",
            "✗".red(),
            failure.path.display(),
            failure.error
        )
    }

    /// Prints the per-extension summary table with a total row.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use smartfile::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("jpg".to_string(), 15);
    /// counts.insert("txt".to_string(), 8);
    /// OutputFormatter::summary_table(&counts);
    /// ```
    pub fn summary_table(counts: &ExtensionCounts) {
        Self::header("Files organized:");
        if counts.is_empty() {
            println!("  none");
            return;
        }

        let width = counts
            .keys()
            .map(|ext| extension_label(ext).len())
            .max()
            .unwrap_or(0)
            .max("Extension".len());
        let total: usize = counts.values().sum();

        println!(
            "{:<width$} | {}",
            "Extension".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));
        for (extension, count) in counts {
            println!(
                "{:<width$} | {} {}",
                extension_label(extension),
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural(total),
            width = width
        );
    }

    /// Builds the machine-readable report printed by `--json`.
    pub fn report_json(
        report: &OrganizeReport,
        source: &Path,
        target: &Path,
        mode: TransferMode,
    ) -> Value {
        json!({
            "finished_at": chrono::Utc::now().to_rfc3339(),
            "source": source.to_string_lossy(),
            "target": target.to_string_lossy(),
            "mode": mode.verb(),
            "counts": report.counts,
            "total": report.total_organized(),
            "transfers": report.completed.iter().map(|t| {
                json!({
                    "source": t.source.to_string_lossy(),
                    "destination": t.destination.to_string_lossy(),
                    "extension": t.extension,
                    "sequence": t.sequence,
                })
            }).collect::<Vec<_>>(),
            "failures": report.failures.iter().map(|f| {
                json!({
                    "path": f.path.to_string_lossy(),
                    "error": f.error.to_string(),
                })
            }).collect::<Vec<_>>(),
        })
    }
}
