//! Read access to the on-disk transfer ledger.
//!
//! The ledger is produced by a separate indexer; this crate only reads it.
//! [`SqliteLedger`] reads the `transactions` table of one chain.

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::types::{BlockHeight, TransactionRecord};

/// Source of transfer records for the graph scan.
pub trait LedgerStore {
    /// Number of ledger rows for this chain.
    fn count(&self) -> Result<u64, CoreError>;

    /// Highest block height in the ledger, `None` when it is empty.
    fn max_height(&self) -> Option<BlockHeight>;

    /// Records of `event` strictly above `min_height` with an amount
    /// strictly above `min_amount`, in ascending height order. Rows without
    /// a sender or recipient are skipped.
    fn rows(
        &self,
        event: &str,
        min_height: BlockHeight,
        min_amount: u128,
    ) -> Result<Vec<TransactionRecord>, CoreError>;
}

// ==============================================================================
// SQLite Ledger
// ==============================================================================

pub struct SqliteLedger {
    conn: Connection,
    chain: String,
    max_height: Option<BlockHeight>,
}

impl SqliteLedger {
    /// Open an existing ledger database read-only.
    ///
    /// The highest stored height is read once here, so it reflects the
    /// ledger as it was when the run started.
    pub fn open(path: impl AsRef<Path>, chain: &str) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let max: Option<i64> = conn.query_row(
            "SELECT MAX(height) FROM transactions WHERE chain = ?1",
            params![chain],
            |row| row.get(0),
        )?;
        let max_height = max
            .and_then(|h| u64::try_from(h).ok())
            .map(BlockHeight);

        info!(
            path = %path.display(),
            chain,
            max_height = ?max_height.map(|h| h.0),
            "ledger opened"
        );

        Ok(Self {
            conn,
            chain: chain.to_owned(),
            max_height,
        })
    }
}

impl LedgerStore for SqliteLedger {
    fn count(&self) -> Result<u64, CoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE chain = ?1",
            params![self.chain],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn max_height(&self) -> Option<BlockHeight> {
        self.max_height
    }

    fn rows(
        &self,
        event: &str,
        min_height: BlockHeight,
        min_amount: u128,
    ) -> Result<Vec<TransactionRecord>, CoreError> {
        let min_height = i64::try_from(min_height.0).map_err(|_| {
            CoreError::InvalidData(format!("start height {min_height} exceeds ledger range"))
        })?;

        // Amounts may exceed SQLite's integer range, so that filter runs
        // after decoding.
        let mut stmt = self.conn.prepare(
            "SELECT height, blockHash, event, senderId, recipientId, amount
             FROM transactions
             WHERE chain = ?1
               AND event = ?2
               AND height > ?3
               AND senderId IS NOT NULL
               AND recipientId IS NOT NULL
             ORDER BY height ASC",
        )?;

        let raw = stmt.query_map(params![self.chain, event, min_height], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Value>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in raw {
            let (height, block_hash, event, sender_id, recipient_id, amount) = row?;
            let amount = parse_amount(amount)?;
            if amount <= min_amount {
                continue;
            }
            let height = u64::try_from(height)
                .map_err(|_| CoreError::InvalidData(format!("negative block height {height}")))?;
            records.push(TransactionRecord {
                height: BlockHeight(height),
                block_hash,
                event,
                sender_id,
                recipient_id,
                amount,
            });
        }

        debug!(chain = %self.chain, records = records.len(), "ledger rows loaded");
        Ok(records)
    }
}

/// Amounts are stored as integers, or as decimal text when they do not
/// fit in 64 bits.
fn parse_amount(value: Value) -> Result<u128, CoreError> {
    match value {
        Value::Integer(n) => u128::try_from(n)
            .map_err(|_| CoreError::InvalidData(format!("negative transfer amount {n}"))),
        Value::Text(text) => text
            .trim()
            .parse::<u128>()
            .map_err(|e| CoreError::InvalidData(format!("transfer amount `{text}`: {e}"))),
        Value::Null => Ok(0),
        other => Err(CoreError::InvalidData(format!(
            "unsupported transfer amount type {:?}",
            other.data_type()
        ))),
    }
}
