//! CSV format handling for command scripts and the account report
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to typed commands
//! - Account report serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{
    Account, Command, CommandRecord, LedgerError, Quote, Shares, Side, StandingAmount,
    TransactionId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns:
/// `tx, command, user, stock, amount, quantity, price`.
/// Every column after `command` is optional; which ones are required depends
/// on the command.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    pub tx: TransactionId,
    pub command: String,
    pub user: Option<String>,
    pub stock: Option<String>,
    pub amount: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
}

/// Convert a CsvRecord to a CommandRecord
///
/// Command names are case-insensitive. Blank fields count as absent.
///
/// # Errors
///
/// - `UnknownCommand` for an unrecognized command name
/// - `MissingField` if a field the command needs is absent
/// - `InvalidField` if a number cannot be parsed
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<CommandRecord, LedgerError> {
    let tx = csv_record.tx;
    let name = csv_record.command.trim().to_lowercase();
    let fields = Fields {
        record: &csv_record,
        name: &name,
    };

    let command = match name.as_str() {
        "authenticate" => Command::Authenticate {
            user: fields.user()?,
        },
        "add" => Command::Deposit {
            user: fields.user()?,
            amount: fields.amount()?,
        },
        "buy" => Command::Buy {
            user: fields.user()?,
            stock: fields.stock()?,
            amount: fields.amount()?,
            quantity: fields.quantity()?,
        },
        "sell" => Command::Sell {
            user: fields.user()?,
            stock: fields.stock()?,
            amount: fields.amount()?,
            quantity: fields.quantity()?,
        },
        "commit_buy" => Command::CommitBuy {
            user: fields.user()?,
        },
        "cancel_buy" => Command::CancelBuy {
            user: fields.user()?,
        },
        "commit_sell" => Command::CommitSell {
            user: fields.user()?,
        },
        "cancel_sell" => Command::CancelSell {
            user: fields.user()?,
        },
        "set_buy_amount" => Command::SetStandingAmount {
            user: fields.user()?,
            stock: fields.stock()?,
            amount: StandingAmount::Buy(fields.amount()?),
        },
        "set_sell_amount" => Command::SetStandingAmount {
            user: fields.user()?,
            stock: fields.stock()?,
            amount: StandingAmount::Sell(fields.quantity()?),
        },
        "set_buy_trigger" | "set_sell_trigger" => Command::SetTrigger {
            user: fields.user()?,
            stock: fields.stock()?,
            side: side_of(&name),
            price: fields.price()?,
        },
        "cancel_set_buy" | "cancel_set_sell" => Command::CancelStanding {
            user: fields.user()?,
            stock: fields.stock()?,
            side: side_of(&name),
        },
        "quote" => Command::Quote(Quote::new(fields.stock()?, fields.price()?)),
        _ => return Err(LedgerError::unknown_command(&csv_record.command, tx)),
    };

    Ok(CommandRecord { tx, command })
}

fn side_of(name: &str) -> Side {
    if name.contains("sell") {
        Side::Sell
    } else {
        Side::Buy
    }
}

/// Required-field accessors for one record
struct Fields<'a> {
    record: &'a CsvRecord,
    name: &'a str,
}

impl Fields<'_> {
    fn required(&self, field: &'static str, value: &Option<String>) -> Result<String, LedgerError> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| LedgerError::missing_field(self.name, field, self.record.tx))
    }

    fn decimal(&self, field: &'static str, value: &Option<String>) -> Result<Decimal, LedgerError> {
        let raw = self.required(field, value)?;
        Decimal::from_str(&raw).map_err(|_| LedgerError::invalid_field(field, &raw, self.record.tx))
    }

    fn user(&self) -> Result<String, LedgerError> {
        self.required("user", &self.record.user)
    }

    fn stock(&self) -> Result<String, LedgerError> {
        self.required("stock", &self.record.stock)
    }

    fn amount(&self) -> Result<Decimal, LedgerError> {
        self.decimal("amount", &self.record.amount)
    }

    fn price(&self) -> Result<Decimal, LedgerError> {
        self.decimal("price", &self.record.price)
    }

    fn quantity(&self) -> Result<Shares, LedgerError> {
        let raw = self.required("quantity", &self.record.quantity)?;
        raw.parse::<Shares>()
            .map_err(|_| LedgerError::invalid_field("quantity", &raw, self.record.tx))
    }
}

/// Write the account report in CSV format
///
/// Writes accounts with columns: user, balance, available, holdings.
/// Accounts are sorted by user id for deterministic output. Money is written
/// exactly, padded to at least two decimal places. Holdings are written as
/// `SYM:qty` pairs joined by `;` in symbol order.
///
/// # Errors
///
/// `IoError` if writing fails.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["user", "balance", "available", "holdings"])
        .map_err(|e| write_error("Failed to write CSV header", e))?;

    let mut sorted_accounts: Vec<&Account> = accounts.iter().collect();
    sorted_accounts.sort_by(|a, b| a.user.cmp(&b.user));

    for account in sorted_accounts {
        let holdings = account
            .holdings
            .iter()
            .map(|(stock, quantity)| format!("{}:{}", stock, quantity))
            .collect::<Vec<_>>()
            .join(";");

        writer.write_record(&[
            account.user.clone(),
            format_money(account.balance),
            format_money(account.available),
            holdings,
        ])
        .map_err(|e| write_error("Failed to write account record", e))?;
    }

    writer.flush()?;

    Ok(())
}

/// Render an amount without rounding, e.g. `76` as `76.00` and `0.008` as `0.008`
fn format_money(value: Decimal) -> String {
    let mut value = value.normalize();
    if value.scale() < 2 {
        value.rescale(2);
    }
    value.to_string()
}

fn write_error(context: &str, error: csv::Error) -> LedgerError {
    LedgerError::IoError {
        message: format!("{}: {}", context, error),
    }
}
