//! Batch processing with user-based partitioning for the async strategy
//!
//! This module provides the `BatchProcessor` struct, which runs a batch of
//! commands concurrently while producing exactly the account state a
//! sequential run would.
//!
//! # Design
//!
//! A batch is cut into segments at every `quote` command. Quotes touch every
//! account holding a standing order on their stock, so they act as barriers:
//! everything before a quote has finished before it is applied, and nothing
//! after it starts until it has been applied.
//!
//! Between two barriers, commands are partitioned by user. Each user's
//! commands run in order on their own tokio task; different users run
//! concurrently. Since user commands only ever touch the issuing user's
//! account, the interleaving across users cannot change the outcome.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── TradingEngine  (shared, cheaply cloneable)
//! ```

use std::collections::HashMap;

use super::TradingEngine;
use crate::types::{Command, CommandRecord, LedgerError, UserId};

/// Result of executing a single command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The command that was executed
    pub record: CommandRecord,

    /// The outcome (success or error)
    pub result: Result<(), LedgerError>,
}

/// A run of user commands, or a quote barrier
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Commands(Vec<CommandRecord>),
    Barrier(CommandRecord),
}

/// Batch processor with user-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: TradingEngine,
}

impl BatchProcessor {
    pub fn new(engine: TradingEngine) -> Self {
        Self { engine }
    }

    /// Cut a batch into user-command runs separated by quote barriers
    ///
    /// Order is preserved and empty runs are omitted.
    pub fn segment(batch: Vec<CommandRecord>) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut run = Vec::new();

        for record in batch {
            if matches!(record.command, Command::Quote(_)) {
                if !run.is_empty() {
                    segments.push(Segment::Commands(std::mem::take(&mut run)));
                }
                segments.push(Segment::Barrier(record));
            } else {
                run.push(record);
            }
        }
        if !run.is_empty() {
            segments.push(Segment::Commands(run));
        }

        segments
    }

    /// Partition user commands by the user they act on
    ///
    /// # Guarantees
    ///
    /// - Each command appears in exactly one sub-batch
    /// - Commands for each user keep their original order
    pub fn partition_by_user(
        &self,
        batch: Vec<CommandRecord>,
    ) -> HashMap<UserId, Vec<CommandRecord>> {
        let mut user_batches: HashMap<UserId, Vec<CommandRecord>> = HashMap::new();

        for record in batch {
            let user = record.command.user().unwrap_or_default().to_string();
            user_batches.entry(user).or_default().push(record);
        }

        user_batches
    }

    /// Execute one user's commands sequentially, in order
    ///
    /// Every command is executed even if earlier ones fail.
    pub async fn process_user_commands(&self, commands: Vec<CommandRecord>) -> Vec<ProcessingResult> {
        commands
            .into_iter()
            .map(|record| self.execute(record))
            .collect()
    }

    /// Execute a batch: barriers in place, user runs partitioned and concurrent
    ///
    /// Results for one user are in input order; across users the order is
    /// unspecified.
    pub async fn process_batch(&self, batch: Vec<CommandRecord>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(batch.len());

        for segment in Self::segment(batch) {
            match segment {
                Segment::Barrier(record) => results.push(self.execute(record)),
                Segment::Commands(commands) => {
                    results.extend(self.process_partitioned(commands).await);
                }
            }
        }

        results
    }

    async fn process_partitioned(&self, commands: Vec<CommandRecord>) -> Vec<ProcessingResult> {
        let user_batches = self.partition_by_user(commands);

        let mut tasks = Vec::with_capacity(user_batches.len());
        for (_user, commands) in user_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_user_commands(commands).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(user_results) => results.extend(user_results),
                Err(e) => {
                    tracing::error!("Command task panicked: {:?}", e);
                }
            }
        }

        results
    }

    fn execute(&self, record: CommandRecord) -> ProcessingResult {
        let result = self.engine.execute(record.clone());
        ProcessingResult { record, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::MemoryAuditSink;
    use crate::types::{Quote, Side, StandingAmount};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn processor() -> (BatchProcessor, TradingEngine) {
        let engine = TradingEngine::new(Arc::new(MemoryAuditSink::new()));
        (BatchProcessor::new(engine.clone()), engine)
    }

    fn record(tx: u64, command: Command) -> CommandRecord {
        CommandRecord { tx, command }
    }

    fn authenticate(tx: u64, user: &str) -> CommandRecord {
        record(
            tx,
            Command::Authenticate {
                user: user.to_string(),
            },
        )
    }

    fn deposit(tx: u64, user: &str, amount: i64) -> CommandRecord {
        record(
            tx,
            Command::Deposit {
                user: user.to_string(),
                amount: Decimal::new(amount, 0),
            },
        )
    }

    fn quote(tx: u64, stock: &str, price: i64) -> CommandRecord {
        record(tx, Command::Quote(Quote::new(stock, Decimal::new(price, 0))))
    }

    #[test]
    fn test_segment_splits_at_quotes() {
        let batch = vec![
            authenticate(1, "a"),
            deposit(2, "a", 10),
            quote(3, "S", 9),
            quote(4, "S", 8),
            deposit(5, "a", 10),
        ];

        let segments = BatchProcessor::segment(batch);

        assert_eq!(segments.len(), 4);
        assert!(matches!(&segments[0], Segment::Commands(run) if run.len() == 2));
        assert!(matches!(&segments[1], Segment::Barrier(r) if r.tx == 3));
        assert!(matches!(&segments[2], Segment::Barrier(r) if r.tx == 4));
        assert!(matches!(&segments[3], Segment::Commands(run) if run[0].tx == 5));
    }

    #[test]
    fn test_segment_empty_batch() {
        assert!(BatchProcessor::segment(vec![]).is_empty());
    }

    #[test]
    fn test_partition_by_user_maintains_order() {
        let (processor, _) = processor();
        let batch = vec![
            authenticate(1, "a"),
            authenticate(2, "b"),
            deposit(3, "a", 10),
            deposit(4, "b", 20),
            deposit(5, "a", 30),
        ];

        let partitioned = processor.partition_by_user(batch);

        assert_eq!(partitioned.len(), 2);
        let a: Vec<u64> = partitioned["a"].iter().map(|r| r.tx).collect();
        let b: Vec<u64> = partitioned["b"].iter().map(|r| r.tx).collect();
        assert_eq!(a, vec![1, 3, 5]);
        assert_eq!(b, vec![2, 4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_many_users() {
        let (processor, engine) = processor();
        let mut batch = Vec::new();
        let mut tx = 0;
        for user in 0..20 {
            let user = format!("user{}", user);
            tx += 1;
            batch.push(authenticate(tx, &user));
            for _ in 0..5 {
                tx += 1;
                batch.push(deposit(tx, &user, 2));
            }
        }

        let results = processor.process_batch(batch).await;

        assert_eq!(results.len(), 120);
        assert!(results.iter().all(|r| r.result.is_ok()));
        let accounts = engine.accounts();
        assert_eq!(accounts.len(), 20);
        assert!(accounts.iter().all(|a| a.balance == Decimal::new(10, 0)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_failures_do_not_stop_user() {
        let (processor, engine) = processor();
        let batch = vec![
            authenticate(1, "a"),
            deposit(2, "a", -5),
            deposit(3, "a", 5),
            deposit(4, "ghost", 5),
        ];

        let results = processor.process_batch(batch).await;

        assert_eq!(results.iter().filter(|r| r.result.is_err()).count(), 2);
        assert_eq!(engine.account("a").unwrap().balance, Decimal::new(5, 0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_quote_sees_only_earlier_commands() {
        let (processor, engine) = processor();
        let batch = vec![
            authenticate(1, "a"),
            deposit(2, "a", 100),
            record(
                3,
                Command::SetStandingAmount {
                    user: "a".to_string(),
                    stock: "S".to_string(),
                    amount: StandingAmount::Buy(Decimal::new(64, 0)),
                },
            ),
            quote(4, "S", 9),
            record(
                5,
                Command::SetTrigger {
                    user: "a".to_string(),
                    stock: "S".to_string(),
                    side: Side::Buy,
                    price: Decimal::new(10, 0),
                },
            ),
            quote(6, "S", 9),
        ];

        processor.process_batch(batch).await;

        // The first quote arrives before the trigger is set and must not fire
        let account = engine.account("a").unwrap();
        assert_eq!(account.holding("S"), 7);
        assert_eq!(account.balance, Decimal::new(37, 0));
    }
}
