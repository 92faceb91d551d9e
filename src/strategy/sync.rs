//! Synchronous processing strategy
//!
//! This module provides a synchronous, single-threaded implementation of the
//! ProcessingStrategy trait. It orchestrates command processing by coordinating
//! between the SyncReader (for CSV input) and TradingEngine (for ledger logic).
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Command execution to `TradingEngine`
//! - Audit events to `TracingAuditSink`, published inline
//! - CSV output to `csv_format::write_accounts_csv`
//!
//! Commands are executed one at a time in file order, with constant memory
//! beyond the accounts themselves.

use crate::core::{TracingAuditSink, TradingEngine};
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{log_rejected, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use rust_trading_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy;
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("commands.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Process commands from input file and write the report to output
    ///
    /// 1. Creates a SyncReader to stream command records from the CSV file
    /// 2. Creates a TradingEngine with a tracing audit sink
    /// 3. Executes each record in order, logging rejected rows and commands
    /// 4. Writes the account report using csv_format::write_accounts_csv
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let engine = TradingEngine::new(Arc::new(TracingAuditSink));

        let reader = SyncReader::new(input_path)?;

        for result in reader {
            match result {
                Ok(record) => {
                    let tx = record.tx;
                    let command = record.command.name();
                    if let Err(e) = engine.execute(record) {
                        log_rejected(tx, command, &e);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping row: {}", e);
                }
            }
        }

        write_accounts_csv(&engine.accounts(), output)?;

        Ok(())
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

    fn run(content: &str) -> String {
        let file = create_temp_csv(content);
        let mut output = Vec::new();

        SyncProcessingStrategy
            .process(file.path(), &mut output)
            .unwrap();

        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_sync_strategy_processes_buy_flow() {
        let output = run("tx,command,user,stock,amount,quantity,price\n\
                          1,authenticate,u1,,,,\n\
                          2,add,u1,,100.00,,\n\
                          3,buy,u1,S,64.00,4,\n\
                          4,commit_buy,u1,,,,\n");

        assert_eq!(
            output,
            "user,balance,available,holdings\nu1,36.00,36.00,S:4\n"
        );
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let mut output = Vec::new();

        let result = SyncProcessingStrategy.process(Path::new("nonexistent.csv"), &mut output);

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
        assert!(output.is_empty());
    }

    #[test]
    fn test_sync_strategy_continues_after_rejections() {
        let output = run("tx,command,user,stock,amount,quantity,price\n\
                          1,authenticate,u1,,,,\n\
                          2,add,u1,,lots,,\n\
                          3,add,ghost,,10.00,,\n\
                          4,commit_sell,u1,,,,\n\
                          5,add,u1,,10.00,,\n");

        assert_eq!(
            output,
            "user,balance,available,holdings\nu1,10.00,10.00,\n"
        );
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
