//! Processing strategy module for command scripts
//!
//! This module defines the Strategy pattern for complete processing pipelines,
//! encompassing both CSV parsing and ledger execution. This allows different
//! implementations (synchronous, asynchronous batch) to be selected at
//! runtime. Both produce the same report for the same script.

use crate::cli::StrategyType;
use crate::types::{LedgerError, TransactionId};
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete command pipelines
///
/// Each strategy reads commands from a CSV script, executes them against a
/// fresh ledger and writes the final account report to the output.
pub trait ProcessingStrategy: Send + Sync {
    /// Process commands from input file and write the report to output
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened (file not found, permission denied)
    /// - The async runtime cannot be started
    /// - Output cannot be written
    ///
    /// Rows that fail to parse and commands the ledger rejects are logged and
    /// skipped; they never make this method fail.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}

/// Log a command the ledger refused
pub(crate) fn log_rejected(tx: TransactionId, command: &str, error: &LedgerError) {
    tracing::warn!(tx, command, "Command rejected: {}", error);
}
