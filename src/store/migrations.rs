//! Forward-only schema migrations
//!
//! A single-row `schema_version` table records the applied version. Each
//! migration runs inside its own transaction together with the version bump,
//! so an interrupted migration re-runs cleanly on the next start.

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};

pub const SCHEMA_VERSION: i64 = 2;

pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let mut version: i64 = match conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()?
    {
        Some(v) => v,
        None => {
            conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])?;
            0
        }
    };

    while version < SCHEMA_VERSION {
        let next = version + 1;
        let tx = conn.transaction()?;
        match next {
            1 => apply_v1(&tx)?,
            2 => apply_v2(&tx)?,
            other => return Err(anyhow!("unknown schema version {}", other)),
        }
        tx.execute("UPDATE schema_version SET version = ?1", params![next])?;
        tx.commit()?;
        version = next;
    }

    Ok(())
}

/// Initial schema: the events table keyed by transaction hash
fn apply_v1(tx: &rusqlite::Transaction) -> Result<()> {
    tx.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
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
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp)",
        [],
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_type ON transactions(tx_type)",
        [],
    )?;

    Ok(())
}

/// Widen the two legacy type codes to the four venue-qualified ones.
/// Legacy rows predate DEX support and were all dispenser events.
fn apply_v2(tx: &rusqlite::Transaction) -> Result<()> {
    tx.execute(
        "UPDATE transactions SET tx_type = 'dispenser_sale' WHERE tx_type = 'sale'",
        [],
    )?;
    tx.execute(
        "UPDATE transactions SET tx_type = 'dispenser_listing' WHERE tx_type = 'listing'",
        [],
    )?;
    Ok(())
}
