use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay a brokerage command script against the trading ledger
#[derive(Parser, Debug)]
#[command(name = "trading-ledger")]
#[command(about = "Replay a brokerage command script and report account state", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing command records
    #[arg(value_name = "INPUT", help = "Path to the input CSV command script")]
    pub input_file: PathBuf,

    /// Processing strategy to use for the command script
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Parsing strategy: 'sync' for synchronous or 'async' for asynchronous"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads for the async runtime (async mode only)
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Number of worker threads processing users concurrently (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,

    /// Default log filter, overridden by RUST_LOG
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        default_value = "warn",
        help = "Log filter for stderr output, e.g. 'info' or 'debug' (RUST_LOG takes precedence)"
    )]
    pub log_level: String,
}

/// Available processing strategies for command scripts
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// This method constructs a BatchConfig using the CLI arguments if provided,
    /// or falls back to default values. Invalid values are replaced by their
    /// defaults with a logged warning.
    ///
    /// # Returns
    ///
    /// A `BatchConfig` with values from CLI arguments or defaults.
    pub fn to_batch_config(&self) -> BatchConfig {
        // Use provided values or defaults
        if self.batch_size.is_some() || self.worker_threads.is_some() {
            // At least one custom value provided, create custom config
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.worker_threads
                    .unwrap_or(default.worker_threads),
            )
        } else {
            // No custom values, use all defaults
            BatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Strategy parsing tests
    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::default_level(&["program", "input.csv"], "warn")]
    #[case::explicit_level(&["program", "--log-level", "debug", "input.csv"], "debug")]
    #[case::directive(&["program", "--log-level", "audit=info", "input.csv"], "audit=info")]
    fn test_log_level_parsing(#[case] args: &[&str], #[case] expected: &str) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.log_level, expected);
    }

    // Individual config option tests
    #[rstest]
    #[case::batch_size(&["program", "--batch-size", "2000", "input.csv"], Some(2000), None)]
    #[case::worker_threads(&["program", "--worker-threads", "8", "input.csv"], None, Some(8))]
    #[case::no_options(&["program", "input.csv"], None, None)]
    #[case::all_options(
        &["program", "--strategy", "async", "--batch-size", "2000", "--worker-threads", "8", "input.csv"],
        Some(2000),
        Some(8)
    )]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] worker_threads: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.worker_threads, worker_threads);
    }

    // BatchConfig conversion tests with valid values
    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "input.csv"], 2000, num_cpus::get())]
    #[case::custom_worker_threads(&["program", "--worker-threads", "8", "input.csv"], 1000, 8)]
    #[case::all_custom(
        &["program", "--batch-size", "2000", "--worker-threads", "8", "input.csv"],
        2000,
        8
    )]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_worker_threads: usize,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.worker_threads, expected_worker_threads);
    }

    // BatchConfig edge cases - zero values should fall back to defaults
    #[rstest]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "input.csv"], "batch_size", 1000)]
    #[case::zero_worker_threads(&["program", "--worker-threads", "0", "input.csv"], "worker_threads", num_cpus::get())]
    fn test_batch_config_zero_values_fallback(
        #[case] args: &[&str],
        #[case] field: &str,
        #[case] expected_default: usize,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_batch_config();

        match field {
            "batch_size" => assert_eq!(config.batch_size, expected_default),
            "worker_threads" => assert_eq!(config.worker_threads, expected_default),
            _ => panic!("Unknown field: {}", field),
        }
    }

    // Error handling tests
    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
