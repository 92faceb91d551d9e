//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over command records from a CSV script.
//! Supports batch reading for the async strategy.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - tokio (through tokio-util's compat layer) for the underlying file
//! - Batch reading so that each batch can be partitioned and run concurrently
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of CommandRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::io::sync_reader::row_error;
use crate::types::CommandRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader
///
/// Rows that cannot be read or converted are logged and skipped.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
        }
    }

    /// Read a batch of command records
    ///
    /// Reads until `batch_size` valid records have been collected or the
    /// input ends. Invalid rows are logged with their line number and do not
    /// count towards the batch.
    ///
    /// # Returns
    ///
    /// The converted records in input order. An empty vector means the end of
    /// the input has been reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<CommandRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(row) = records.next().await else {
                break;
            };
            self.line_num += 1;

            let converted = row
                .map_err(|e| row_error(self.line_num, e))
                .and_then(|csv_record| {
                    convert_csv_record(csv_record).map_err(|e| row_error(self.line_num, e))
                });
            match converted {
                Ok(record) => batch.push(record),
                Err(e) => tracing::warn!("Skipping row: {}", e),
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Command;
    use futures::io::Cursor;
    use rust_decimal::Decimal;

    const HEADER: &str = "tx,command,user,stock,amount,quantity,price\n";

    fn reader(rows: &str) -> AsyncReader<Cursor<Vec<u8>>> {
        let content = format!("{}{}", HEADER, rows);
        AsyncReader::new(Cursor::new(content.into_bytes()))
    }

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let mut async_reader = reader(
            "1,authenticate,u1,,,,\n\
             2,add,u1,,100.00,,\n\
             3,quote,,S,,,9\n",
        );

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].tx, 1);
        assert_eq!(
            batch[1].command,
            Command::Deposit {
                user: "u1".to_string(),
                amount: Decimal::new(10000, 2),
            }
        );

        let batch = async_reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].command.name(), "quote");
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut async_reader = reader("");

        let batch = async_reader.read_batch(10).await;
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_rows() {
        let mut async_reader = reader(
            "1,dumplog,u1,,,,\n\
             x,add,u1,,5,,\n\
             3,add,u1,,,,\n\
             4,add,u1,,50.00,,\n",
        );

        let batch = async_reader.read_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].tx, 4);
    }

    #[tokio::test]
    async fn test_async_reader_multiple_batches() {
        let mut async_reader = reader(
            "1,add,u1,,1,,\n\
             2,add,u1,,2,,\n\
             3,add,u1,,3,,\n\
             4,add,u1,,4,,\n\
             5,add,u1,,5,,\n",
        );

        let batch1 = async_reader.read_batch(2).await;
        assert_eq!(batch1.iter().map(|r| r.tx).collect::<Vec<_>>(), vec![1, 2]);

        let batch2 = async_reader.read_batch(2).await;
        assert_eq!(batch2.iter().map(|r| r.tx).collect::<Vec<_>>(), vec![3, 4]);

        let batch3 = async_reader.read_batch(2).await;
        assert_eq!(batch3.len(), 1);
        assert_eq!(batch3[0].tx, 5);

        let batch4 = async_reader.read_batch(2).await;
        assert!(batch4.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_whitespace_handling() {
        let mut async_reader = reader("  1 ,  Authenticate  ,  u1  ,,,,\n");

        let batch = async_reader.read_batch(10).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch[0].command,
            Command::Authenticate {
                user: "u1".to_string()
            }
        );
    }
}
