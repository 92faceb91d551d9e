//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over command records from a CSV script.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SyncReader uses csv::Reader to read and deserialize CSV records sequentially,
//! delegating parsing and conversion to the csv_format module. Records are
//! processed one at a time without loading the entire file into memory.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<CommandRecord, LedgerError>` for each CSV row:
//!
//! ```no_run
//! use rust_trading_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("commands.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("Command: {:?}", record),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Rows that cannot be read or converted are yielded as `ParseError` with
//!   their line number, and iteration continues with the next row

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{CommandRecord, LedgerError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Synchronous CSV reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (trailing optional columns may be omitted)
    /// - Use an 8KB buffer for efficient I/O
    ///
    /// # Errors
    ///
    /// `FileNotFound` if the path does not exist, `IoError` if it cannot be
    /// opened.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| open_error(path, e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

pub(crate) fn open_error(path: &Path, error: std::io::Error) -> LedgerError {
    if error.kind() == ErrorKind::NotFound {
        LedgerError::FileNotFound {
            path: path.display().to_string(),
        }
    } else {
        LedgerError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), error),
        }
    }
}

/// Attach the input line to a row that was rejected
pub(crate) fn row_error(line: u64, error: impl ToString) -> LedgerError {
    LedgerError::ParseError {
        line: Some(line),
        message: error.to_string(),
    }
}

impl Iterator for SyncReader {
    type Item = Result<CommandRecord, LedgerError>;

    /// Get the next command record from the CSV file
    ///
    /// # Returns
    ///
    /// * `Some(Ok(CommandRecord))` - Successfully parsed record
    /// * `Some(Err(LedgerError::ParseError))` - Rejected row, with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;

        Some(
            row.map_err(|e| row_error(self.line_num, e))
                .and_then(|csv_record| {
                    convert_csv_record(csv_record).map_err(|e| row_error(self.line_num, e))
                }),
        )
    }
}
