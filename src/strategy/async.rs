//! Asynchronous batch processing strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ProcessingStrategy trait. It executes commands in batches with user-based
//! partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, worker_threads)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (quote barriers + user partitioning)
//!     └── TradingEngine (per-account locked state)
//!         └── ChannelAuditSink ──► AuditWorker task ──► TracingAuditSink
//! ```
//!
//! # Thread-Based Parallelism
//!
//! - Batches are processed one after another, preserving file order per user
//! - Within a batch, quotes are barriers and the runs between them are
//!   partitioned by user and executed on tokio worker threads
//! - Audit events leave the ledger through an unbounded channel and are
//!   logged by a dedicated task, so command tasks never wait on logging

use crate::core::{
    AuditSink, BatchProcessor, ChannelAuditSink, TracingAuditSink, TradingEngine,
};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::open_error;
use crate::strategy::{log_rejected, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
///
/// Controls how commands are batched and the number of worker threads
/// for parallel processing within each batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub worker_threads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            worker_threads: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, worker_threads: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size,
                default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let worker_threads = if worker_threads == 0 {
            tracing::warn!(
                "Invalid worker_threads ({}), using default ({})",
                worker_threads,
                default.worker_threads
            );
            default.worker_threads
        } else {
            worker_threads
        };

        Self {
            batch_size,
            worker_threads,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Process commands from input file and write the report to output
    ///
    /// 1. Starts a tokio multi-threaded runtime and the audit worker task
    /// 2. Reads commands in batches using AsyncReader
    /// 3. Runs each batch to completion before reading the next
    /// 4. Closes the audit channel and waits for the worker to drain it
    /// 5. Writes the account report using csv_format module
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| open_error(input_path, e))?;

            let downstream: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
            let (audit, worker) = ChannelAuditSink::channel(downstream);
            let worker = tokio::spawn(worker.run());

            let engine = TradingEngine::new(Arc::new(audit));
            let processor = BatchProcessor::new(engine.clone());

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Wait for the whole batch before reading the next one so that
                // a user's commands spanning batches stay in order
                for processed in processor.process_batch(batch).await {
                    if let Err(e) = &processed.result {
                        log_rejected(processed.record.tx, processed.record.command.name(), e);
                    }
                }
            }

            let accounts = engine.accounts();

            // Dropping the last senders lets the worker drain and finish
            drop(processor);
            drop(engine);
            match worker.await {
                Ok(forwarded) => tracing::debug!(forwarded, "Audit events delivered"),
                Err(e) => tracing::error!("Audit worker failed: {:?}", e),
            }

            write_accounts_csv(&accounts, output)?;

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(config: BatchConfig, content: &str) -> String {
        let file = create_temp_csv(content);
        let mut output = Vec::new();

        AsyncProcessingStrategy::new(config)
            .process(file.path(), &mut output)
            .unwrap();

        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_batch_config_zero_values_fall_back() {
        let config = BatchConfig::new(0, 0);

        assert_eq!(config, BatchConfig::default());
    }

    #[test]
    fn test_async_strategy_processes_multiple_users() {
        let output = run(
            BatchConfig::default(),
            "tx,command,user,stock,amount,quantity,price\n\
             1,authenticate,a,,,,\n\
             2,authenticate,b,,,,\n\
             3,add,a,,10.00,,\n\
             4,add,b,,20.00,,\n\
             5,add,a,,5.00,,\n",
        );

        assert_eq!(
            output,
            "user,balance,available,holdings\na,15.00,15.00,\nb,20.00,20.00,\n"
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let mut output = Vec::new();

        let result = AsyncProcessingStrategy::new(BatchConfig::default())
            .process(Path::new("nonexistent.csv"), &mut output);

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }

    #[test]
    fn test_async_strategy_maintains_ordering_across_batches() {
        // A batch size of 2 splits every user's commands over several batches
        let output = run(
            BatchConfig::new(2, 4),
            "tx,command,user,stock,amount,quantity,price\n\
             1,authenticate,u1,,,,\n\
             2,add,u1,,100.00,,\n\
             3,buy,u1,S,64.00,4,\n\
             4,commit_buy,u1,,,,\n\
             5,sell,u1,S,30.00,2,\n\
             6,commit_sell,u1,,,,\n",
        );

        assert_eq!(
            output,
            "user,balance,available,holdings\nu1,66.00,66.00,S:2\n"
        );
    }

    #[test]
    fn test_async_strategy_quote_barrier() {
        let output = run(
            BatchConfig::default(),
            "tx,command,user,stock,amount,quantity,price\n\
             1,authenticate,u1,,,,\n\
             2,add,u1,,100.00,,\n\
             3,set_buy_amount,u1,S,64.00,,\n\
             4,set_buy_trigger,u1,S,,,10.00\n\
             5,quote,,S,,,9.00\n\
             6,cancel_set_buy,u1,S,,,\n",
        );

        assert_eq!(
            output,
            "user,balance,available,holdings\nu1,37.00,37.00,S:7\n"
        );
    }
}
