//! DuckDB ledger store
//!
//! Amounts are DECIMAL(18,2) columns written with an explicit cast from their
//! decimal text and read back as VARCHAR so no value passes through floating
//! point. Timestamps are RFC 3339 text.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use duckdb::{params, Connection, Row, ToSql};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::locks::AccountLocks;
use crate::domain::money::{to_ledger_scale, MAX_AMOUNT, SCALE};
use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AccountId, AccountStatus, AccountUpdate, NewAccount, NewTransfer, Transfer,
    TransferId, TransferOrder, TransferPair, TransferReceipt, TransferType,
};
use crate::migrations::MIGRATIONS;
use crate::ports::{LedgerStore, LedgerSummary, TransferGuard};
use crate::services::{MigrationResult, MigrationService};

/// Concurrency and retry tuning for [`DuckDbLedger`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Longest wait for the account locks of one operation
    pub lock_timeout: Duration,
    /// Attempts for opening a busy file and for write-write conflicts
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry
    pub initial_retry_delay: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(5000),
            max_retries: 5,
            initial_retry_delay: Duration::from_millis(50),
        }
    }
}

impl StoreOptions {
    /// Delay before retry number `attempt` (zero-based): 50, 100, 200ms...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_retry_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_open_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB reports optimistic-concurrency failures as "conflict" errors
fn is_conflict_error(err_msg: &str) -> bool {
    err_msg.to_lowercase().contains("conflict")
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        let msg = err.to_string();
        if is_conflict_error(&msg) {
            Error::ConcurrencyConflict(msg)
        } else {
            Error::Database(msg)
        }
    }
}

const ACCOUNT_COLUMNS: &str = "account_id, name, iban, status, available_amount::VARCHAR, \
                               created_on, modified_on";

const TRANSFER_COLUMNS: &str = "transfer_id, account_id, beneficiary_account_id, transfer_type, \
                                amount::VARCHAR, created_on, modified_on, idempotency_key";

/// Current time at the precision the store keeps
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("invalid timestamp '{}': {}", s, e)))
}

fn parse_amount(s: &str) -> Result<Decimal> {
    let mut amount = Decimal::from_str_exact(s)
        .or_else(|_| Decimal::from_str(s))
        .map_err(|e| Error::database(format!("invalid amount '{}': {}", s, e)))?;
    amount.rescale(SCALE);
    Ok(amount)
}

struct AccountRow {
    id: i64,
    name: String,
    iban: String,
    status: String,
    amount: String,
    created_on: String,
    modified_on: String,
}

impl AccountRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            iban: row.get(2)?,
            status: row.get(3)?,
            amount: row.get(4)?,
            created_on: row.get(5)?,
            modified_on: row.get(6)?,
        })
    }

    fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: self.id,
            name: self.name,
            iban: self.iban,
            status: self.status.parse()?,
            available_amount: parse_amount(&self.amount)?,
            created_on: parse_timestamp(&self.created_on)?,
            modified_on: parse_timestamp(&self.modified_on)?,
        })
    }
}

struct TransferRow {
    id: i64,
    account_id: i64,
    beneficiary_account_id: i64,
    transfer_type: String,
    amount: String,
    created_on: String,
    modified_on: String,
    idempotency_key: Option<String>,
}

impl TransferRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            beneficiary_account_id: row.get(2)?,
            transfer_type: row.get(3)?,
            amount: row.get(4)?,
            created_on: row.get(5)?,
            modified_on: row.get(6)?,
            idempotency_key: row.get(7)?,
        })
    }

    fn into_transfer(self) -> Result<Transfer> {
        Ok(Transfer {
            id: self.id,
            account_id: self.account_id,
            beneficiary_account_id: self.beneficiary_account_id,
            transfer_type: TransferType::parse(&self.transfer_type)?,
            amount: parse_amount(&self.amount)?,
            created_on: parse_timestamp(&self.created_on)?,
            modified_on: parse_timestamp(&self.modified_on)?,
            idempotency_key: self.idempotency_key,
        })
    }
}

fn query_accounts(conn: &Connection, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<Account>> {
    let sql = format!(
        "SELECT {} FROM accounts {} ORDER BY account_id",
        ACCOUNT_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(args, AccountRow::read)?
        .collect::<duckdb::Result<Vec<_>>>()?;
    rows.into_iter().map(AccountRow::into_account).collect()
}

fn query_transfers(
    conn: &Connection,
    filter: &str,
    args: &[&dyn ToSql],
) -> Result<Vec<Transfer>> {
    let sql = format!(
        "SELECT {} FROM transfers {} ORDER BY transfer_id",
        TRANSFER_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(args, TransferRow::read)?
        .collect::<duckdb::Result<Vec<_>>>()?;
    rows.into_iter().map(TransferRow::into_transfer).collect()
}

fn load_account(conn: &Connection, id: AccountId) -> Result<Account> {
    query_accounts(conn, "WHERE account_id = ?", params![id])?
        .into_iter()
        .next()
        .ok_or_else(|| Error::account_not_found(id))
}

/// Reject a name or IBAN already held by another account
fn ensure_unique(
    conn: &Connection,
    name: &str,
    iban: &str,
    except: Option<AccountId>,
) -> Result<()> {
    // ids start at 1
    let except = except.unwrap_or(0);
    let name_taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM accounts WHERE name = ? AND account_id <> ?",
        params![name, except],
        |row| row.get(0),
    )?;
    if name_taken {
        return Err(Error::DuplicateName(name.to_string()));
    }
    let iban_taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM accounts WHERE iban = ? AND account_id <> ?",
        params![iban, except],
        |row| row.get(0),
    )?;
    if iban_taken {
        return Err(Error::DuplicateIban(iban.to_string()));
    }
    Ok(())
}

fn insert_account(
    conn: &Connection,
    id: AccountId,
    account: &NewAccount,
    now: DateTime<Utc>,
) -> Result<Account> {
    let stamp = format_timestamp(now);
    conn.execute(
        "INSERT INTO accounts (account_id, name, iban, status, available_amount, created_on, modified_on)
         VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18,2)), ?, ?)",
        params![
            id,
            account.name,
            account.iban,
            AccountStatus::Active.as_str(),
            account.initial_amount.to_string(),
            stamp,
            stamp,
        ],
    )?;
    Ok(Account {
        id,
        name: account.name.clone(),
        iban: account.iban.clone(),
        status: AccountStatus::Active,
        available_amount: account.initial_amount,
        created_on: now,
        modified_on: now,
    })
}

/// The only writer of `available_amount`
///
/// Must run inside a transaction while the account's lock is held. A result
/// below zero or beyond [`MAX_AMOUNT`] is rejected before anything is written.
fn write_balance_delta(
    conn: &Connection,
    account: &Account,
    delta: Decimal,
    now: DateTime<Utc>,
) -> Result<Account> {
    let updated = account.available_amount + delta;
    if updated < Decimal::ZERO {
        return Err(Error::InsufficientFunds { id: account.id });
    }
    if updated > MAX_AMOUNT {
        return Err(Error::InvalidAmount(format!(
            "balance of account {} would exceed the maximum amount {}",
            account.id, MAX_AMOUNT
        )));
    }
    conn.execute(
        "UPDATE accounts SET available_amount = CAST(? AS DECIMAL(18,2)), modified_on = ?
         WHERE account_id = ?",
        params![updated.to_string(), format_timestamp(now), account.id],
    )?;
    Ok(Account {
        available_amount: updated,
        modified_on: now,
        ..account.clone()
    })
}

fn insert_transfer(
    conn: &Connection,
    id: TransferId,
    transfer: &NewTransfer,
    now: DateTime<Utc>,
) -> Result<Transfer> {
    let stamp = format_timestamp(now);
    conn.execute(
        "INSERT INTO transfers (transfer_id, account_id, beneficiary_account_id, transfer_type,
                                amount, created_on, modified_on, idempotency_key)
         VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18,2)), ?, ?, ?)",
        params![
            id,
            transfer.account_id,
            transfer.beneficiary_account_id,
            transfer.transfer_type.as_str(),
            transfer.amount.to_string(),
            stamp,
            stamp,
            transfer.idempotency_key,
        ],
    )?;
    Ok(Transfer {
        id,
        account_id: transfer.account_id,
        beneficiary_account_id: transfer.beneficiary_account_id,
        transfer_type: transfer.transfer_type,
        amount: transfer.amount,
        created_on: now,
        modified_on: now,
        idempotency_key: transfer.idempotency_key.clone(),
    })
}

/// Pair previously written by `from` under `key`, if any
fn find_replay(conn: &Connection, from: AccountId, key: &str) -> Result<Option<TransferPair>> {
    let debit = match query_transfers(
        conn,
        "WHERE account_id = ? AND idempotency_key = ? AND transfer_type = 'DEBIT'",
        params![from, key],
    )?
    .into_iter()
    .next()
    {
        Some(debit) => debit,
        None => return Ok(None),
    };

    let credit = query_transfers(
        conn,
        "WHERE account_id = ? AND beneficiary_account_id = ? AND idempotency_key = ?
           AND transfer_type = 'CREDIT'",
        params![debit.beneficiary_account_id, from, key],
    )?
    .into_iter()
    .next()
    .ok_or_else(|| Error::database(format!("transfer {} has no matching credit", debit.id)))?;

    Ok(Some(TransferPair { debit, credit }))
}

/// DuckDB-backed [`LedgerStore`]
///
/// Each operation works on its own clone of the root connection, so reads
/// never wait for writers. Writers coordinate through per-account locks.
pub struct DuckDbLedger {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    options: StoreOptions,
    locks: AccountLocks,
    /// Serializes name/IBAN uniqueness checks with the writes they guard
    catalog: Mutex<()>,
    last_account_id: AtomicI64,
    last_transfer_id: AtomicI64,
}

impl DuckDbLedger {
    /// Open (or create) a ledger database file
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn open(db_path: &Path, options: StoreOptions) -> anyhow::Result<Self> {
        let attempts = options.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match Self::try_open_connection(db_path) {
                Ok(conn) => return Ok(Self::with_connection(conn, Some(db_path), options)),
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_open_error(&err_msg) && attempt + 1 < attempts {
                        let delay = options.backoff(attempt);
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = attempts,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", attempts)))
    }

    /// Open a private in-memory ledger
    pub fn open_in_memory(options: StoreOptions) -> anyhow::Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self::with_connection(conn, None, options))
    }

    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn with_connection(conn: Connection, db_path: Option<&Path>, options: StoreOptions) -> Self {
        Self {
            conn: Mutex::new(conn),
            db_path: db_path.map(Path::to_path_buf),
            options,
            locks: AccountLocks::new(options.lock_timeout),
            catalog: Mutex::new(()),
            last_account_id: AtomicI64::new(0),
            last_transfer_id: AtomicI64::new(0),
        }
    }

    /// Run pending migrations and resume id allocation after the stored rows
    pub fn ensure_schema(&self) -> anyhow::Result<MigrationResult> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let result = MigrationService::new(&conn, MIGRATIONS).run_pending()?;

        let max_account: i64 =
            conn.query_row("SELECT COALESCE(MAX(account_id), 0) FROM accounts", [], |r| r.get(0))?;
        let max_transfer: i64 = conn.query_row(
            "SELECT COALESCE(MAX(transfer_id), 0) FROM transfers",
            [],
            |r| r.get(0),
        )?;
        self.last_account_id.fetch_max(max_account, Ordering::SeqCst);
        self.last_transfer_id.fetch_max(max_transfer, Ordering::SeqCst);

        if !result.applied.is_empty() {
            debug!(applied = ?result.applied, "applied ledger migrations");
        }
        Ok(result)
    }

    /// Path of the database file, `None` when in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn connection(&self) -> Result<Connection> {
        let root = self.conn.lock()?;
        Ok(root.try_clone()?)
    }

    fn next_account_id(&self) -> AccountId {
        self.last_account_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn next_transfer_id(&self) -> TransferId {
        self.last_transfer_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run `work` on a fresh connection, retrying write-write conflicts
    ///
    /// `work` must open and commit its own transaction so a failed attempt
    /// leaves nothing behind.
    fn with_retry<T>(
        &self,
        operation: &'static str,
        mut work: impl FnMut(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let attempts = self.options.max_retries.max(1);
        let mut attempt = 0;
        loop {
            let mut conn = self.connection()?;
            match work(&mut conn) {
                Err(Error::ConcurrencyConflict(msg)) if attempt + 1 < attempts => {
                    let delay = self.options.backoff(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "write conflict, retrying: {}",
                        msg
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Insert both rows of a transfer. Caller owns the enclosing transaction.
    fn record_transfer_pair(
        &self,
        conn: &Connection,
        debit: &NewTransfer,
        credit: &NewTransfer,
        now: DateTime<Utc>,
    ) -> Result<TransferPair> {
        let debit = insert_transfer(conn, self.next_transfer_id(), debit, now)?;
        let credit = insert_transfer(conn, self.next_transfer_id(), credit, now)?;
        Ok(TransferPair { debit, credit })
    }
}

impl LedgerStore for DuckDbLedger {
    fn create_account(&self, account: &NewAccount) -> Result<Account> {
        let _catalog = self.catalog.lock()?;
        self.with_retry("create_account", |conn| {
            let tx = conn.transaction()?;
            ensure_unique(&tx, &account.name, &account.iban, None)?;
            let created = insert_account(&tx, self.next_account_id(), account, now())?;
            tx.commit()?;
            Ok(created)
        })
    }

    fn create_accounts(&self, accounts: &[NewAccount]) -> Result<Vec<Account>> {
        let _catalog = self.catalog.lock()?;
        self.with_retry("create_accounts", |conn| {
            let tx = conn.transaction()?;
            let now = now();
            let mut created = Vec::with_capacity(accounts.len());
            for account in accounts {
                // sees rows inserted earlier in this batch
                ensure_unique(&tx, &account.name, &account.iban, None)?;
                created.push(insert_account(&tx, self.next_account_id(), account, now)?);
            }
            tx.commit()?;
            Ok(created)
        })
    }

    fn get_account(&self, id: AccountId) -> Result<Account> {
        load_account(&self.connection()?, id)
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        query_accounts(&self.connection()?, "", params![])
    }

    fn update_account(&self, id: AccountId, update: &AccountUpdate) -> Result<Account> {
        let _catalog = self.catalog.lock()?;
        let _locks = self.locks.acquire(&[id])?;
        self.with_retry("update_account", |conn| {
            let tx = conn.transaction()?;
            let current = load_account(&tx, id)?;
            ensure_unique(&tx, &update.name, &update.iban, Some(id))?;

            let now = now();
            let mut account = current.clone();
            if current.name != update.name || current.iban != update.iban {
                tx.execute(
                    "UPDATE accounts SET name = ?, iban = ?, modified_on = ? WHERE account_id = ?",
                    params![update.name, update.iban, format_timestamp(now), id],
                )?;
                account.name = update.name.clone();
                account.iban = update.iban.clone();
                account.modified_on = now;
            }

            let delta = update.available_amount - current.available_amount;
            if !delta.is_zero() {
                account = write_balance_delta(&tx, &account, delta, now)?;
            }
            tx.commit()?;
            Ok(account)
        })
    }

    fn update_account_status(&self, id: AccountId, status: AccountStatus) -> Result<Account> {
        let _locks = self.locks.acquire(&[id])?;
        self.with_retry("update_account_status", |conn| {
            let tx = conn.transaction()?;
            let current = load_account(&tx, id)?;
            if current.status == status {
                return Ok(current);
            }
            let now = now();
            tx.execute(
                "UPDATE accounts SET status = ?, modified_on = ? WHERE account_id = ?",
                params![status.as_str(), format_timestamp(now), id],
            )?;
            tx.commit()?;
            Ok(Account {
                status,
                modified_on: now,
                ..current
            })
        })
    }

    fn apply_balance_delta(&self, id: AccountId, delta: Decimal) -> Result<Account> {
        let delta = to_ledger_scale(delta)?;
        let _locks = self.locks.acquire(&[id])?;
        self.with_retry("apply_balance_delta", |conn| {
            let tx = conn.transaction()?;
            let current = load_account(&tx, id)?;
            let account = write_balance_delta(&tx, &current, delta, now())?;
            tx.commit()?;
            Ok(account)
        })
    }

    fn delete_account(&self, id: AccountId) -> Result<()> {
        let _locks = self.locks.acquire(&[id])?;
        self.with_retry("delete_account", |conn| {
            let tx = conn.transaction()?;
            load_account(&tx, id)?;
            let referenced: bool = tx.query_row(
                "SELECT COUNT(*) > 0 FROM transfers WHERE account_id = ? OR beneficiary_account_id = ?",
                params![id, id],
                |row| row.get(0),
            )?;
            if referenced {
                return Err(Error::AccountInUse(id));
            }
            tx.execute("DELETE FROM accounts WHERE account_id = ?", params![id])?;
            tx.commit()?;
            Ok(())
        })
    }

    fn execute_transfer(
        &self,
        order: &TransferOrder,
        guard: &TransferGuard<'_>,
    ) -> Result<TransferReceipt> {
        let _locks = self.locks.acquire(&[order.from, order.to])?;
        self.with_retry("execute_transfer", |conn| {
            let tx = conn.transaction()?;

            if let Some(key) = order.idempotency_key.as_deref() {
                if let Some(pair) = find_replay(&tx, order.from, key)? {
                    debug!(debit_id = pair.debit.id, "replaying idempotent transfer");
                    return Ok(TransferReceipt {
                        pair,
                        replayed: true,
                    });
                }
            }

            let from = load_account(&tx, order.from)?;
            let to = load_account(&tx, order.to)?;
            guard(&from, &to)?;

            let now = now();
            write_balance_delta(&tx, &from, -order.amount, now)?;
            write_balance_delta(&tx, &to, order.amount, now)?;
            let (debit, credit) = order.legs();
            let pair = self.record_transfer_pair(&tx, &debit, &credit, now)?;
            tx.commit()?;

            Ok(TransferReceipt {
                pair,
                replayed: false,
            })
        })
    }

    fn get_transfer(&self, id: TransferId) -> Result<Transfer> {
        query_transfers(&self.connection()?, "WHERE transfer_id = ?", params![id])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::transfer_not_found(id))
    }

    fn list_transfers(&self, owner: Option<AccountId>) -> Result<Vec<Transfer>> {
        let conn = self.connection()?;
        match owner {
            Some(id) => query_transfers(&conn, "WHERE account_id = ?", params![id]),
            None => query_transfers(&conn, "", params![]),
        }
    }

    fn summary(&self) -> Result<LedgerSummary> {
        let conn = self.connection()?;
        let (accounts, frozen_accounts, transfer_records, total): (i64, i64, i64, String) = conn
            .query_row(
                "SELECT
                    (SELECT COUNT(*) FROM accounts),
                    (SELECT COUNT(*) FROM accounts WHERE status = 'FROZEN'),
                    (SELECT COUNT(*) FROM transfers),
                    (SELECT COALESCE(SUM(available_amount), 0) FROM accounts)::VARCHAR",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
        Ok(LedgerSummary {
            accounts,
            frozen_accounts,
            transfer_records,
            total_balance: parse_amount(&total)?,
        })
    }
}
