//! Command-line interface module for smartfile.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Merging the configuration file with command-line overrides
//! - Organization orchestration with progress output
//! - Dry-run previews and JSON reports

use crate::config::Config;
use crate::file_organizer::{FileFailure, OrganizeError, OrganizeReport, Organizer, Plan};
use crate::output::OutputFormatter;
use crate::transfer::TransferMode;
use clap::{ArgAction, Parser};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

/// Rename files sequentially by extension into a target folder.
#[derive(Debug, Clone, Parser)]
#[command(name = "smartfile", version, about)]
pub struct Cli {
    /// Target folder where renamed files will be placed
    #[arg(short = 't', long, value_name = "DIR")]
    pub target: PathBuf,

    /// Source folder containing files to organize
    #[arg(short = 's', long, value_name = "DIR")]
    pub source: PathBuf,

    /// Naming pattern for an extension, e.g. `-p jpg 'image_{:02d}'`
    #[arg(
        short = 'p',
        long = "pattern",
        num_args = 2,
        value_names = ["EXT", "PATTERN"],
        action = ArgAction::Append
    )]
    pub patterns: Vec<String>,

    /// Default naming pattern, e.g. 'file_{:02d}'
    #[arg(short = 'd', long = "default", value_name = "PATTERN")]
    pub default_pattern: Option<String>,

    /// Move files instead of copying them
    #[arg(short = 'm', long = "move")]
    pub move_files: bool,

    /// Process folders recursively
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Show what would happen without touching any file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Configuration file (defaults to .smartfilerc.toml or ~/.config/smartfile/config.toml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The `--pattern EXT PATTERN` pairs in the order given.
    pub fn pattern_overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.patterns
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }
}

/// Settings after layering command-line arguments over the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub patterns: BTreeMap<String, String>,
    pub default_pattern: Option<String>,
    pub recursive: bool,
    pub mode: TransferMode,
}

impl RunSettings {
    /// Command-line patterns replace configured patterns for the same
    /// extension; the flags can only switch behaviour on.
    pub fn merge(config: &Config, cli: &Cli) -> Self {
        let mut patterns: BTreeMap<String, String> = config
            .patterns
            .iter()
            .map(|(ext, pattern)| (crate::normalize_extension(ext), pattern.clone()))
            .collect();
        for (ext, pattern) in cli.pattern_overrides() {
            patterns.insert(crate::normalize_extension(ext), pattern.to_string());
        }

        Self {
            patterns,
            default_pattern: cli
                .default_pattern
                .clone()
                .or_else(|| config.default_pattern.clone()),
            recursive: cli.recursive || config.recursive,
            mode: TransferMode::from_move_flag(cli.move_files || config.move_files),
        }
    }

    /// Applies the patterns to an organizer.
    pub fn configure(&self, organizer: &mut Organizer) {
        if let Some(pattern) = &self.default_pattern {
            organizer.set_default_pattern(pattern.as_str());
        }
        for (ext, pattern) in &self.patterns {
            organizer.set_naming_pattern(ext, pattern.as_str());
        }
    }
}

/// Runs the CLI application.
///
/// Errors organizing individual files, and a missing source folder, are
/// reported on standard output and do not make this function fail. Only a
/// broken configuration or an unusable target folder are returned as errors.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use smartfile::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["smartfile", "-t", "renamed", "-s", "photos", "-p", "jpg", "img_{:02d}"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), String> {
    let config = Config::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;
    let settings = RunSettings::merge(&config, cli);

    let mut organizer = if cli.dry_run {
        Organizer::preview(&cli.target)
    } else {
        Organizer::new(&cli.target).map_err(|e| e.to_string())?
    };
    organizer.set_filters(filters);
    settings.configure(&mut organizer);

    if !cli.json {
        OutputFormatter::info(&format!(
            "Organizing contents of {} into {}",
            cli.source.display(),
            cli.target.display()
        ));
    }

    let plan = match organizer.plan(&cli.source, settings.recursive) {
        Ok(plan) => plan,
        Err(e) => {
            if cli.json {
                tracing::error!("Error: {}", e);
                let report = OrganizeReport::default();
                let value =
                    OutputFormatter::report_json(&report, &cli.source, &cli.target, settings.mode);
                println!("{}", value);
            } else {
                write_plan_error(&mut io::stdout().lock(), &e).map_err(output_error)?;
            }
            return Ok(());
        }
    };

    if cli.dry_run {
        return preview_plan(&plan, settings.mode).map_err(output_error);
    }

    let pb = OutputFormatter::create_progress_bar(plan.transfers.len() as u64, !cli.json);
    let report = organizer.execute(plan, settings.mode, |transfer, error| {
        if error.is_none() && !cli.json {
            pb.suspend(|| println!("{}", OutputFormatter::transfer_line(transfer, settings.mode)));
        }
        pb.inc(1);
    });
    pb.finish_and_clear();

    if cli.json {
        let value = OutputFormatter::report_json(&report, &cli.source, &cli.target, settings.mode);
        println!("{}", value);
        return Ok(());
    }

    write_failures(&mut io::stdout().lock(), &report.failures).map_err(output_error)?;
    OutputFormatter::summary_table(&report.counts);
    if report.is_complete_success() {
        OutputFormatter::success("Organization complete!");
    } else {
        OutputFormatter::warning(&format!(
            "{} file(s) could not be organized. Please review errors above.",
            report.failures.len()
        ));
    }

    Ok(())
}

fn output_error(e: io::Error) -> String {
    format!("Error writing output: {}", e)
}

/// Reports a source folder that could not be organized at all.
fn write_plan_error<W: Write>(out: &mut W, error: &OrganizeError) -> io::Result<()> {
    writeln!(out, "{}", OutputFormatter::error_line(&format!("Error: {}", error)))
}

/// Reports every file that could not be organized, one per line.
fn write_failures<W: Write>(out: &mut W, failures: &[FileFailure]) -> io::Result<()> {
    for failure in failures {
        writeln!(out, "{}", OutputFormatter::failure_line(failure))?;
    }
    Ok(())
}

/// Prints what a run would do without touching the filesystem.
fn preview_plan(plan: &Plan, mode: TransferMode) -> io::Result<()> {
    if plan.is_empty() {
        OutputFormatter::dry_run_notice("No files found to organize.");
        return Ok(());
    }

    OutputFormatter::dry_run_notice("Files would be organized as follows:");
    let mut counts = BTreeMap::new();
    for transfer in &plan.transfers {
        println!("{}", OutputFormatter::preview_line(transfer, mode));
        *counts.entry(transfer.extension.clone()).or_insert(0) += 1;
    }
    write_failures(&mut io::stdout().lock(), &plan.failures)?;

    OutputFormatter::summary_table(&counts);
    OutputFormatter::dry_run_notice("No files were modified.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["smartfile"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = parse(&[
            "-t", "out", "-s", "in", "-p", "jpg", "img_{:02d}", "--pattern", ".PNG", "pic_{}",
            "-d", "doc_{:03d}", "-m", "-r", "-n", "--json", "-vv",
        ]);

        assert_eq!(cli.target, PathBuf::from("out"));
        assert_eq!(cli.source, PathBuf::from("in"));
        assert_eq!(
            cli.pattern_overrides().collect::<Vec<_>>(),
            vec![("jpg", "img_{:02d}"), (".PNG", "pic_{}")]
        );
        assert_eq!(cli.default_pattern.as_deref(), Some("doc_{:03d}"));
        assert!(cli.move_files && cli.recursive && cli.dry_run && cli.json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_target_and_source_are_required() {
        assert!(Cli::try_parse_from(["smartfile", "-t", "out"]).is_err());
        assert!(Cli::try_parse_from(["smartfile", "-s", "in"]).is_err());
    }

    #[test]
    fn test_pattern_needs_two_values() {
        assert!(Cli::try_parse_from(["smartfile", "-t", "o", "-s", "i", "-p", "jpg"]).is_err());
    }

    #[test]
    fn test_merge_cli_overrides_config() {
        let config: Config = toml::from_str(
            r#"
default_pattern = "cfg_{}"
recursive = true

[patterns]
JPG = "cfg_img_{}"
txt = "cfg_txt_{}"
"#,
        )
        .unwrap();
        let cli = parse(&["-t", "o", "-s", "i", "-p", "jpg", "cli_img_{}"]);

        let settings = RunSettings::merge(&config, &cli);

        assert_eq!(settings.patterns["jpg"], "cli_img_{}");
        assert_eq!(settings.patterns["txt"], "cfg_txt_{}");
        assert_eq!(settings.default_pattern.as_deref(), Some("cfg_{}"));
        assert!(settings.recursive);
        assert_eq!(settings.mode, TransferMode::Copy);
    }

    #[test]
    fn test_missing_source_is_written_to_output() {
        let organizer = Organizer::preview("o");
        let missing = PathBuf::from("no-such-source-folder");
        let error = organizer.plan(&missing, false).unwrap_err();

        let mut out = Vec::new();
        write_plan_error(&mut out, &error).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("no-such-source-folder"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_failures_are_written_one_per_line() {
        let mut organizer = Organizer::preview("o");
        organizer.set_naming_pattern("txt", "bad_{}_{}");
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(temp_dir.path().join("b.txt"), "b").unwrap();
        let plan = organizer.plan(temp_dir.path(), false).unwrap();

        let mut out = Vec::new();
        write_failures(&mut out, &plan.failures).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("a.txt") && text.contains("b.txt"));
    }

    #[test]
    fn test_configure_applies_patterns() {
        let cli = parse(&["-t", "o", "-s", "i", "-d", "x_{}", "-p", "md", "note_{}"]);
        let settings = RunSettings::merge(&Config::default(), &cli);
        let mut organizer = Organizer::preview("o");

        settings.configure(&mut organizer);

        assert_eq!(organizer.pattern_for("md"), "note_{}");
        assert_eq!(organizer.pattern_for("txt"), "x_{}");
    }
}
