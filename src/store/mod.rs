//! Durable, deduplicated transaction storage
//!
//! One SQLite database per process. Deduplication rides on the primary key
//! with INSERT OR IGNORE; a repeated hash is a `false` return, not an error.

mod migrations;

use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use crate::shutdown::Shutdown;
use crate::types::{Transaction, TransactionType};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

/// Rolling retention window for stored events
pub const RETENTION_DAYS: i64 = 30;

/// Interval between retention purges
const PURGE_INTERVAL_SECS: u64 = 24 * 60 * 60;

const SALE_TYPES: &str = "('dispenser_sale', 'dex_sale')";
const LISTING_TYPES: &str = "('dispenser_listing', 'dex_listing')";

/// Aggregate counts for health reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub total: i64,
    pub sales: i64,
    pub listings: i64,
    pub oldest_timestamp: Option<i64>,
}

pub struct TransactionStore {
    conn: Mutex<Connection>,
}

impl TransactionStore {
    /// Open (or create) the store and bring the schema up to date.
    /// Failure here aborts pipeline startup; nothing downstream is usable
    /// without storage.
    pub fn open<P: AsRef<Path>>(path: P) -> BotResult<Self> {
        let mut conn = Connection::open(path)?;
        migrations::migrate(&mut conn)
            .map_err(|e| BotError::Storage(format!("schema migration failed: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert-or-ignore on the primary key. Returns whether a new row was
    /// created; `false` means a pure duplicate.
    pub fn insert(&self, tx: &Transaction) -> BotResult<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO transactions
                (tx_hash, tx_type, asset, amount, price, payment_asset,
                 timestamp, block_index, notified, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                tx.tx_hash,
                tx.tx_type.as_code(),
                tx.asset,
                tx.amount,
                tx.price,
                tx.payment_asset,
                tx.timestamp,
                tx.block_index,
                tx.notified,
                tx.created_at
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Cheap membership test, the primary dedup guard
    pub fn exists(&self, tx_hash: &str) -> BotResult<bool> {
        let conn = self.conn.lock().unwrap();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM transactions WHERE tx_hash = ?1",
                params![tx_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Idempotent; a missing hash is a no-op
    pub fn mark_notified(&self, tx_hash: &str) -> BotResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE transactions SET notified = 1 WHERE tx_hash = ?1",
            params![tx_hash],
        )?;
        Ok(())
    }

    pub fn get(&self, tx_hash: &str) -> BotResult<Option<Transaction>> {
        let conn = self.conn.lock().unwrap();
        let tx = conn
            .query_row(
                &format!("{} WHERE tx_hash = ?1", SELECT_COLUMNS),
                params![tx_hash],
                row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// The `limit` most recent sales, oldest first
    pub fn query_sales(&self, limit: u32) -> BotResult<Vec<Transaction>> {
        self.query_recent(SALE_TYPES, limit)
    }

    /// The `limit` most recent listings, oldest first
    pub fn query_listings(&self, limit: u32) -> BotResult<Vec<Transaction>> {
        self.query_recent(LISTING_TYPES, limit)
    }

    fn query_recent(&self, type_set: &str, limit: u32) -> BotResult<Vec<Transaction>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT * FROM ({} WHERE tx_type IN {} ORDER BY timestamp DESC LIMIT ?1)
             ORDER BY timestamp ASC",
            SELECT_COLUMNS, type_set
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit], row_to_transaction)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Sales observed inside the rolling retention window
    pub fn total_sales(&self) -> BotResult<i64> {
        self.count_since(SALE_TYPES, window_start())
    }

    /// Listings observed inside the rolling retention window
    pub fn total_listings(&self) -> BotResult<i64> {
        self.count_since(LISTING_TYPES, window_start())
    }

    fn count_since(&self, type_set: &str, since: i64) -> BotResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM transactions WHERE tx_type IN {} AND timestamp >= ?1",
                type_set
            ),
            params![since],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete rows older than the retention window. Returns the rows removed.
    pub fn purge_old(&self) -> BotResult<u64> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM transactions WHERE timestamp < ?1",
            params![window_start()],
        )?;
        Ok(removed as u64)
    }

    pub fn stats(&self) -> BotResult<StoreStats> {
        let conn = self.conn.lock().unwrap();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))?;
        let sales: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM transactions WHERE tx_type IN {}", SALE_TYPES),
            [],
            |r| r.get(0),
        )?;
        let listings: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM transactions WHERE tx_type IN {}",
                LISTING_TYPES
            ),
            [],
            |r| r.get(0),
        )?;
        let oldest_timestamp: Option<i64> =
            conn.query_row("SELECT MIN(timestamp) FROM transactions", [], |r| r.get(0))?;

        Ok(StoreStats {
            total,
            sales,
            listings,
            oldest_timestamp,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT tx_hash, tx_type, asset, amount, price, payment_asset,
        timestamp, block_index, notified, created_at FROM transactions";

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let code: String = row.get(1)?;
    let tx_type = TransactionType::from_code(&code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown transaction type '{}'", code).into(),
        )
    })?;

    Ok(Transaction {
        tx_hash: row.get(0)?,
        tx_type,
        asset: row.get(2)?,
        amount: row.get(3)?,
        price: row.get(4)?,
        payment_asset: row.get(5)?,
        timestamp: row.get(6)?,
        block_index: row.get(7)?,
        notified: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn window_start() -> i64 {
    Utc::now().timestamp() - RETENTION_DAYS * 24 * 60 * 60
}

/// Retention task: purge once immediately, then every 24 hours until shutdown
pub fn spawn_purge_task(
    store: Arc<TransactionStore>,
    shutdown: Arc<Shutdown>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match store.purge_old() {
                Ok(0) => logger::debug(LogTag::Store, "retention purge removed nothing"),
                Ok(n) => logger::info(
                    LogTag::Store,
                    &format!("retention purge removed {} transactions", n),
                ),
                Err(e) => logger::error(LogTag::Store, &format!("retention purge failed: {}", e)),
            }

            tokio::select! {
                _ = shutdown.wait() => {
                    logger::info(LogTag::Store, "retention task stopped");
                    break;
                }
                _ = sleep(Duration::from_secs(PURGE_INTERVAL_SECS)) => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, TransactionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TransactionStore::open(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn sample(hash: &str, tx_type: TransactionType, timestamp: i64) -> Transaction {
        Transaction {
            tx_hash: hash.to_string(),
            tx_type,
            asset: "FAKERARE".to_string(),
            amount: 1,
            price: 1_000_000,
            payment_asset: "BTC".to_string(),
            timestamp,
            block_index: 820_000,
            notified: false,
            created_at: Utc::now().timestamp(),
        }
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let (_dir, store) = open_temp();
        let tx = sample("aa", TransactionType::DispenserSale, 1_700_000_000);

        assert!(store.insert(&tx).unwrap());
        assert!(!store.insert(&tx).unwrap());
        assert_eq!(store.stats().unwrap().total, 1);
    }

    #[test]
    fn exists_reflects_inserts() {
        let (_dir, store) = open_temp();
        assert!(!store.exists("aa").unwrap());
        store
            .insert(&sample("aa", TransactionType::DexListing, 1_700_000_000))
            .unwrap();
        assert!(store.exists("aa").unwrap());
    }

    #[test]
    fn mark_notified_missing_hash_is_a_noop() {
        let (_dir, store) = open_temp();
        store.mark_notified("missing").unwrap();

        store
            .insert(&sample("aa", TransactionType::DispenserSale, 1_700_000_000))
            .unwrap();
        store.mark_notified("aa").unwrap();
        assert!(store.get("aa").unwrap().unwrap().notified);
    }

    #[test]
    fn query_sales_returns_most_recent_oldest_first() {
        let (_dir, store) = open_temp();
        let now = Utc::now().timestamp();
        for (i, hash) in ["s1", "s2", "s3", "s4"].iter().enumerate() {
            store
                .insert(&sample(hash, TransactionType::DispenserSale, now + i as i64))
                .unwrap();
        }
        store
            .insert(&sample("l1", TransactionType::DispenserListing, now + 10))
            .unwrap();

        let sales = store.query_sales(3).unwrap();
        let hashes: Vec<&str> = sales.iter().map(|t| t.tx_hash.as_str()).collect();
        assert_eq!(hashes, vec!["s2", "s3", "s4"]);
    }

    #[test]
    fn retention_purges_only_outside_the_window() {
        let (_dir, store) = open_temp();
        let now = Utc::now().timestamp();
        let old = now - 31 * 24 * 60 * 60;
        let recent = now - 29 * 24 * 60 * 60;

        store
            .insert(&sample("old", TransactionType::DispenserSale, old))
            .unwrap();
        store
            .insert(&sample("recent", TransactionType::DispenserSale, recent))
            .unwrap();

        assert_eq!(store.purge_old().unwrap(), 1);
        assert!(!store.exists("old").unwrap());
        assert!(store.exists("recent").unwrap());
    }

    #[test]
    fn window_counts_split_by_category() {
        let (_dir, store) = open_temp();
        let now = Utc::now().timestamp();

        store
            .insert(&sample("s1", TransactionType::DispenserSale, now))
            .unwrap();
        store
            .insert(&sample("s2", TransactionType::DexSale, now))
            .unwrap();
        store
            .insert(&sample("l1", TransactionType::DexListing, now))
            .unwrap();
        // Outside the rolling window, counted by stats but not totals
        store
            .insert(&sample("s3", TransactionType::DispenserSale, now - 40 * 24 * 60 * 60))
            .unwrap();

        assert_eq!(store.total_sales().unwrap(), 2);
        assert_eq!(store.total_listings().unwrap(), 1);

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.sales, 3);
        assert_eq!(stats.listings, 1);
        assert_eq!(stats.oldest_timestamp, Some(now - 40 * 24 * 60 * 60));
    }

    #[test]
    fn migration_rewrites_legacy_type_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");

        // Build a version-1 database with legacy two-variant rows
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "CREATE TABLE schema_version (version INTEGER NOT NULL)",
                [],
            )
            .unwrap();
            conn.execute("INSERT INTO schema_version (version) VALUES (1)", [])
                .unwrap();
            conn.execute(
                "CREATE TABLE transactions (
                    tx_hash TEXT PRIMARY KEY,
                    tx_type TEXT NOT NULL,
                    asset TEXT NOT NULL,
                    amount INTEGER NOT NULL,
                    price INTEGER NOT NULL DEFAULT 0,
                    payment_asset TEXT NOT NULL DEFAULT '',
                    timestamp INTEGER NOT NULL,
                    block_index INTEGER NOT NULL,
                    notified INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL
                )",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO transactions VALUES
                    ('aa', 'sale', 'FAKERARE', 1, 0, '', 1700000000, 820000, 0, 1700000000),
                    ('bb', 'listing', 'FAKERARE', 1, 0, '', 1700000001, 820001, 0, 1700000001)",
                [],
            )
            .unwrap();
        }

        let store = TransactionStore::open(&path).unwrap();
        assert_eq!(
            store.get("aa").unwrap().unwrap().tx_type,
            TransactionType::DispenserSale
        );
        assert_eq!(
            store.get("bb").unwrap().unwrap().tx_type,
            TransactionType::DispenserListing
        );

        // Reopening must be a no-op
        drop(store);
        let store = TransactionStore::open(&path).unwrap();
        assert_eq!(store.stats().unwrap().total, 2);
    }
}
