use clap::Parser;
use smartfile::cli::{Cli, run_cli};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run_cli(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr; `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Per-file failures are already printed by the CLI, so warnings stay quiet
/// until `-v` is given.
fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    format!("smartfile={}", level)
}
