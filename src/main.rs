//! Rust Trading Ledger CLI
//!
//! Command-line interface for replaying brokerage command scripts.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > accounts.csv
//! cargo run -- --strategy sync commands.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --worker-threads 8 commands.csv > accounts.csv
//! cargo run -- --log-level info commands.csv > accounts.csv
//! ```
//!
//! The program reads command records from the input CSV file, executes them
//! against the trading ledger using the selected processing strategy, and
//! writes the final account report to stdout. Logs go to stderr.
//!
//! # Processing Strategies
//!
//! - **sync**: Synchronous CSV parsing with single-threaded execution
//! - **async**: Asynchronous batch processing with multi-threaded parallelism (default)
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use rust_trading_ledger::cli;
use rust_trading_ledger::strategy;
use std::process;

fn main() {
    let args = cli::parse_args();
    cli::init_logging(&args.log_level);

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    // Output goes to stdout
    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
