// CLI module
// Command-line interface, argument parsing and log setup

mod args;

pub use args::{CliArgs, StrategyType};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Parse command-line arguments using clap
///
/// If parsing fails (e.g., invalid arguments, missing required arguments, or
/// --help flag), clap will automatically display an error message or help
/// text and exit the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (the `--log-level`
/// value) is used. Logs go to stderr so stdout only carries the report.
pub fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
