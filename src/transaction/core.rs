//! Defines the core data models and database queries for the transaction log.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{Error, OwnerId, database_id::TransactionId, money::Amount};

// ============================================================================
// MODELS
// ============================================================================

/// The payment method or category used when the client does not give one.
pub const DEFAULT_TAG: &str = "Other";

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received, e.g. a salary deposit.
    Credit,
    /// Money spent, e.g. a card payment.
    Debit,
    /// Cash taken out of an account. Counts towards the debit total.
    Withdrawal,
}

impl TransactionKind {
    /// The lowercase name used in the database and in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "credit",
            TransactionKind::Debit => "debit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }

    /// Split `amount` into the `(credit, debit)` deltas, in minor units, that
    /// a transaction of this kind contributes to the running totals.
    pub(crate) fn deltas(&self, amount: Amount) -> (i64, i64) {
        match self {
            TransactionKind::Credit => (amount.minor_units(), 0),
            TransactionKind::Debit | TransactionKind::Withdrawal => (0, amount.minor_units()),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(TransactionKind::Credit),
            "debit" => Ok(TransactionKind::Debit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            _ => Err(Error::InvalidKind(s.to_owned())),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A credit, debit or withdrawal recorded for an owner.
///
/// To record a new `Transaction`, use [Transaction::build] and pass the builder
/// to [crate::Ledger::record_transaction].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account holder the transaction belongs to.
    pub owner_id: OwnerId,
    /// Whether money came in or went out.
    pub kind: TransactionKind,
    /// How the transaction was paid, e.g. "Card" or "Cash".
    pub method: String,
    /// What the transaction was for, e.g. "Groceries".
    pub category: String,
    /// The amount of money that moved.
    pub amount: Amount,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// The aggregate generation this transaction's amount was counted in.
    #[serde(skip)]
    pub generation: i64,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(kind: TransactionKind, amount: Amount) -> TransactionBuilder {
        TransactionBuilder {
            kind,
            amount,
            method: None,
            category: None,
            description: None,
            occurred_at: None,
        }
    }
}

/// A builder for recording [Transaction] instances.
///
/// Optional fields fall back to defaults when the transaction is recorded: the
/// method and category become [DEFAULT_TAG] and the occurrence time becomes
/// the time of recording.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// Whether money came in or went out.
    pub kind: TransactionKind,
    /// The amount of money that moved.
    pub amount: Amount,
    /// How the transaction was paid.
    pub method: Option<String>,
    /// What the transaction was for.
    pub category: Option<String>,
    /// A text description, trimmed before saving.
    pub description: Option<String>,
    /// When the transaction happened.
    pub occurred_at: Option<OffsetDateTime>,
}

impl TransactionBuilder {
    /// Set the payment method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set when the transaction happened.
    pub fn occurred_at(mut self, occurred_at: OffsetDateTime) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}

/// Changes to apply to an existing transaction. Fields left as `None` keep
/// their current value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionUpdate {
    /// The new kind.
    pub kind: Option<TransactionKind>,
    /// The new amount.
    pub amount: Option<Amount>,
    /// The new payment method.
    pub method: Option<String>,
    /// The new category.
    pub category: Option<String>,
    /// The new description. An empty string clears the description.
    pub description: Option<String>,
    /// The new occurrence time.
    pub occurred_at: Option<OffsetDateTime>,
}

impl TransactionUpdate {
    /// Return a copy of `transaction` with this update applied.
    pub(crate) fn apply_to(&self, transaction: &Transaction) -> Transaction {
        let mut updated = transaction.clone();

        if let Some(kind) = self.kind {
            updated.kind = kind;
        }
        if let Some(amount) = self.amount {
            updated.amount = amount;
        }
        if let Some(method) = &self.method {
            updated.method = normalize_tag(Some(method));
        }
        if let Some(category) = &self.category {
            updated.category = normalize_tag(Some(category));
        }
        if let Some(description) = &self.description {
            updated.description = normalize_description(Some(description));
        }
        if let Some(occurred_at) = self.occurred_at {
            updated.occurred_at = occurred_at.to_offset(UtcOffset::UTC);
        }

        updated
    }
}

/// Trim a free-form tag, falling back to [DEFAULT_TAG] when it is blank.
fn normalize_tag(tag: Option<&str>) -> String {
    match tag.map(str::trim) {
        Some(tag) if !tag.is_empty() => tag.to_owned(),
        _ => DEFAULT_TAG.to_owned(),
    }
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|description| !description.is_empty())
        .map(str::to_owned)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str = "id, owner_id, kind, method, category, amount, description, \
     occurred_at, created_at, generation";

/// Append a transaction to the log.
///
/// `generation` is the aggregate generation the amount was added to, and
/// `now` is used as the record-creation time. Callers must run this in the
/// same SQL transaction as the matching aggregate update.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub(crate) fn insert_transaction(
    owner: OwnerId,
    builder: &TransactionBuilder,
    generation: i64,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let now = now.to_offset(UtcOffset::UTC);
    let occurred_at = builder
        .occurred_at
        .map_or(now, |occurred_at| occurred_at.to_offset(UtcOffset::UTC));

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" \
             (owner_id, kind, method, category, amount, description, occurred_at, created_at, generation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                owner.as_i64(),
                builder.kind,
                normalize_tag(builder.method.as_deref()),
                normalize_tag(builder.category.as_deref()),
                builder.amount.minor_units(),
                normalize_description(builder.description.as_deref()),
                occurred_at,
                now,
                generation,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve one of `owner`'s transactions by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if `id` does not refer to a transaction owned by `owner`,
/// - or [Error::SqlError] there is some other SQL error.
pub(crate) fn get_transaction(
    owner: OwnerId,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND owner_id = ?2"
        ))?
        .query_row((id, owner.as_i64()), map_transaction_row)
        .optional()?
        .ok_or(Error::TransactionNotFound(id))
}

/// Get all of `owner`'s transactions, most recent occurrence first.
///
/// Transactions that occurred at the same time are ordered most recently
/// recorded first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub(crate) fn list_transactions(
    owner: OwnerId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" \
             WHERE owner_id = :owner_id \
             ORDER BY occurred_at DESC, id DESC"
        ))?
        .query_map(&[(":owner_id", &owner.as_i64())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Overwrite the editable fields of a stored transaction with `transaction`.
///
/// The owner, creation time and generation are never changed.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if the transaction is not in the database,
/// - or [Error::SqlError] there is some other SQL error.
pub(crate) fn save_transaction(
    transaction: &Transaction,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
         SET kind = ?1, method = ?2, category = ?3, amount = ?4, description = ?5, occurred_at = ?6
         WHERE id = ?7 AND owner_id = ?8",
        (
            transaction.kind,
            &transaction.method,
            &transaction.category,
            transaction.amount.minor_units(),
            &transaction.description,
            transaction.occurred_at,
            transaction.id,
            transaction.owner_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::TransactionNotFound(transaction.id));
    }

    Ok(())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub(crate) fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Sum `owner`'s transactions counted in `generation` as `(credit, debit)`
/// minor units, straight from the log.
#[cfg(test)]
pub(crate) fn sum_generation(
    owner: OwnerId,
    generation: i64,
    connection: &Connection,
) -> Result<(i64, i64), Error> {
    connection
        .query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN kind = 'credit' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind IN ('debit', 'withdrawal') THEN amount ELSE 0 END), 0)
             FROM \"transaction\" WHERE owner_id = ?1 AND generation = ?2",
            (owner.as_i64(), generation),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('credit', 'debit', 'withdrawal')),
                method TEXT NOT NULL DEFAULT 'Other',
                category TEXT NOT NULL DEFAULT 'Other',
                amount INTEGER NOT NULL CHECK (amount > 0),
                description TEXT,
                occurred_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                generation INTEGER NOT NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Index used for listing an owner's transactions newest first.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_owner_occurred \
         ON \"transaction\"(owner_id, occurred_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let owner_id = OwnerId::new(row.get(1)?);
    let kind = row.get(2)?;
    let method = row.get(3)?;
    let category = row.get(4)?;
    let amount = Amount::from_minor_units(row.get(5)?);
    let description = row.get(6)?;
    let occurred_at = row.get(7)?;
    let created_at = row.get(8)?;
    let generation = row.get(9)?;

    Ok(Transaction {
        id,
        owner_id,
        kind,
        method,
        category,
        amount,
        description,
        occurred_at,
        created_at,
        generation,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error, OwnerId,
        db::initialize,
        money::Amount,
        transaction::{
            DEFAULT_TAG, Transaction, TransactionKind, TransactionUpdate,
            core::{get_transaction, insert_transaction, list_transactions, save_transaction},
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn amount(raw: &str) -> Amount {
        raw.parse().unwrap()
    }

    #[test]
    fn insert_applies_defaults() {
        let conn = get_test_connection();
        let owner = OwnerId::new(1);
        let now = datetime!(2025-10-05 12:00 UTC);

        let transaction = insert_transaction(
            owner,
            &Transaction::build(TransactionKind::Debit, amount("12.30")),
            0,
            now,
            &conn,
        )
        .expect("Could not insert transaction");

        assert_eq!(transaction.id, 1);
        assert_eq!(transaction.owner_id, owner);
        assert_eq!(transaction.method, DEFAULT_TAG);
        assert_eq!(transaction.category, DEFAULT_TAG);
        assert_eq!(transaction.description, None);
        assert_eq!(transaction.occurred_at, now);
        assert_eq!(transaction.created_at, now);
    }

    #[test]
    fn insert_trims_free_form_fields() {
        let conn = get_test_connection();
        let builder = Transaction::build(TransactionKind::Credit, amount("100"))
            .method("  Bank transfer ")
            .category("   ")
            .description("  Salary  ");

        let transaction =
            insert_transaction(OwnerId::new(1), &builder, 0, datetime!(2025-10-05 12:00 UTC), &conn)
                .unwrap();

        assert_eq!(transaction.method, "Bank transfer");
        assert_eq!(transaction.category, DEFAULT_TAG);
        assert_eq!(transaction.description.as_deref(), Some("Salary"));
    }

    #[test]
    fn list_orders_by_most_recent_occurrence() {
        let conn = get_test_connection();
        let owner = OwnerId::new(1);
        let now = datetime!(2025-10-05 12:00 UTC);
        for (day, raw_amount) in [(1, "1"), (3, "3"), (2, "2")] {
            let occurred_at = datetime!(2025-10-01 09:00 UTC).replace_day(day).unwrap();
            let builder = Transaction::build(TransactionKind::Debit, amount(raw_amount))
                .occurred_at(occurred_at);
            insert_transaction(owner, &builder, 0, now, &conn).unwrap();
        }

        let amounts: Vec<_> = list_transactions(owner, &conn)
            .unwrap()
            .into_iter()
            .map(|transaction| transaction.amount)
            .collect();

        assert_eq!(amounts, [amount("3"), amount("2"), amount("1")]);
    }

    #[test]
    fn list_only_returns_owners_transactions() {
        let conn = get_test_connection();
        let now = datetime!(2025-10-05 12:00 UTC);
        let builder = Transaction::build(TransactionKind::Debit, amount("5"));
        insert_transaction(OwnerId::new(1), &builder, 0, now, &conn).unwrap();
        insert_transaction(OwnerId::new(2), &builder, 0, now, &conn).unwrap();

        let transactions = list_transactions(OwnerId::new(2), &conn).unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].owner_id, OwnerId::new(2));
    }

    #[test]
    fn get_fails_for_other_owner() {
        let conn = get_test_connection();
        let builder = Transaction::build(TransactionKind::Debit, amount("5"));
        let transaction = insert_transaction(
            OwnerId::new(1),
            &builder,
            0,
            datetime!(2025-10-05 12:00 UTC),
            &conn,
        )
        .unwrap();

        let result = get_transaction(OwnerId::new(2), transaction.id, &conn);

        assert_eq!(result, Err(Error::TransactionNotFound(transaction.id)));
    }

    #[test]
    fn save_updates_editable_fields() {
        let conn = get_test_connection();
        let owner = OwnerId::new(1);
        let original = insert_transaction(
            owner,
            &Transaction::build(TransactionKind::Debit, amount("5")),
            0,
            datetime!(2025-10-05 12:00 UTC),
            &conn,
        )
        .unwrap();
        let update = TransactionUpdate {
            kind: Some(TransactionKind::Withdrawal),
            amount: Some(amount("7.5")),
            description: Some("ATM".to_owned()),
            ..Default::default()
        };

        let updated = update.apply_to(&original);
        save_transaction(&updated, &conn).unwrap();

        assert_eq!(get_transaction(owner, original.id, &conn), Ok(updated));
    }

    #[test]
    fn rejects_unknown_kind() {
        assert_eq!(
            "refund".parse::<TransactionKind>(),
            Err(Error::InvalidKind("refund".to_owned()))
        );
        assert_eq!("Credit".parse::<TransactionKind>(), Ok(TransactionKind::Credit));
    }

    #[test]
    fn withdrawals_count_as_debits() {
        assert_eq!(TransactionKind::Withdrawal.deltas(amount("2")), (0, 200));
        assert_eq!(TransactionKind::Credit.deltas(amount("2")), (200, 0));
    }
}
