//! Audit event reporting
//!
//! The engine reports every state change it makes to an [`AuditSink`] after
//! the account lock has been released. Publishing never fails from the
//! ledger's point of view: a sink that cannot deliver logs the problem and
//! drops the event.
//!
//! Three sinks are provided:
//!
//! - [`TracingAuditSink`] writes each event as a `tracing` record with target `audit`
//! - [`ChannelAuditSink`] hands events to an [`AuditWorker`] task over a tokio channel
//! - [`MemoryAuditSink`] keeps events in memory

use crate::types::{Shares, Side, Symbol, TransactionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// What happened to an account
#[derive(Debug, Clone, PartialEq)]
pub enum AuditKind {
    Deposited {
        amount: Decimal,
    },
    BuyCommitted {
        stock: Symbol,
        amount: Decimal,
        quantity: Shares,
    },
    /// Pending buy released by a cancel or by a replacing reservation
    BuyCanceled {
        stock: Symbol,
        amount: Decimal,
        quantity: Shares,
    },
    SellCommitted {
        stock: Symbol,
        amount: Decimal,
        quantity: Shares,
    },
    SellCanceled {
        stock: Symbol,
        amount: Decimal,
        quantity: Shares,
    },
    StandingCanceled {
        stock: Symbol,
        side: Side,
    },
    /// A standing order fired on a quote
    Triggered {
        stock: Symbol,
        side: Side,
        price: Decimal,
        quantity: Shares,
        amount: Decimal,
        /// When the firing quote was observed
        quoted_at: DateTime<Utc>,
    },
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditKind::Deposited { amount } => write!(f, "deposited {amount}"),
            AuditKind::BuyCommitted {
                stock,
                amount,
                quantity,
            } => write!(f, "bought {quantity} {stock} for {amount}"),
            AuditKind::BuyCanceled {
                stock,
                amount,
                quantity,
            } => write!(f, "canceled buy of {quantity} {stock} for {amount}"),
            AuditKind::SellCommitted {
                stock,
                amount,
                quantity,
            } => write!(f, "sold {quantity} {stock} for {amount}"),
            AuditKind::SellCanceled {
                stock,
                amount,
                quantity,
            } => write!(f, "canceled sell of {quantity} {stock} for {amount}"),
            AuditKind::StandingCanceled { stock, side } => {
                write!(f, "canceled standing {side} on {stock}")
            }
            AuditKind::Triggered {
                stock,
                side,
                price,
                quantity,
                amount,
                ..
            } => write!(
                f,
                "standing {side} triggered: {quantity} {stock} at {price} for {amount}"
            ),
        }
    }
}

/// A single audit record
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub user: UserId,
    pub tx: TransactionId,
    pub at: DateTime<Utc>,
    pub kind: AuditKind,
}

impl AuditEvent {
    /// Create an event stamped with the current time
    pub fn new(user: impl Into<UserId>, tx: TransactionId, kind: AuditKind) -> Self {
        Self {
            user: user.into(),
            tx,
            at: Utc::now(),
            kind,
        }
    }
}

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    /// Deliver one event, best effort
    fn publish(&self, event: AuditEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn publish(&self, event: AuditEvent) {
        tracing::info!(
            target: "audit",
            user = %event.user,
            tx = event.tx,
            at = %event.at.to_rfc3339(),
            "{}",
            event.kind
        );
    }
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event published so far, in publication order
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn publish(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Sends events to an [`AuditWorker`] over an unbounded channel
///
/// Publishing never blocks. If the worker has gone away the event is logged
/// and dropped.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelAuditSink {
    /// Create a connected sink and worker
    ///
    /// The worker forwards every event to `downstream`. It finishes once all
    /// clones of the sink have been dropped and the channel is drained.
    pub fn channel(downstream: Arc<dyn AuditSink>) -> (Self, AuditWorker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self { sender },
            AuditWorker {
                receiver,
                downstream,
            },
        )
    }
}

impl AuditSink for ChannelAuditSink {
    fn publish(&self, event: AuditEvent) {
        if let Err(mpsc::error::SendError(event)) = self.sender.send(event) {
            tracing::warn!(
                user = %event.user,
                tx = event.tx,
                "Audit channel closed, dropping event: {}",
                event.kind
            );
        }
    }
}

/// Drains a [`ChannelAuditSink`] into a downstream sink
pub struct AuditWorker {
    receiver: mpsc::UnboundedReceiver<AuditEvent>,
    downstream: Arc<dyn AuditSink>,
}

impl AuditWorker {
    /// Forward events until every sender is dropped
    ///
    /// # Returns
    ///
    /// The number of events forwarded.
    pub async fn run(mut self) -> usize {
        let mut forwarded = 0;
        while let Some(event) = self.receiver.recv().await {
            self.downstream.publish(event);
            forwarded += 1;
        }
        tracing::debug!(forwarded, "Audit worker finished");
        forwarded
    }
}

impl fmt::Debug for AuditWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditWorker")
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}
