//! Append-only order / transaction ledger
//!
//! `JsonlLedger` writes one JSON object per line to `orders.jsonl` and
//! `transactions.jsonl`. `MemoryLedger` keeps records in memory and backs
//! the integration tests.
//!
//! File I/O goes through `tokio::fs`, so appends never block a runtime
//! worker.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use eyre::{eyre, Result};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::types::{OrderRecord, TransactionRecord};
use crate::providers::traits::LedgerStore;

pub const ORDERS_FILE: &str = "orders.jsonl";
pub const TRANSACTIONS_FILE: &str = "transactions.jsonl";

pub struct JsonlLedger {
    dir: PathBuf,
    /// Serializes appends so lines never interleave
    write_lock: Mutex<()>,
}

impl JsonlLedger {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| eyre!("Failed to create ledger dir {}: {}", dir.display(), e))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn append_line<T: Serialize>(&self, file: &str, record: &T) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let path = self.dir.join(file);

        let _guard = self.write_lock.lock().await;
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| eyre!("Failed to open {}: {}", path.display(), e))?;
        handle
            .write_all(line.as_bytes())
            .await
            .map_err(|e| eyre!("Failed to append to {}: {}", path.display(), e))?;
        handle.flush().await?;

        debug!("💾 Ledger append: {}", file);
        Ok(())
    }

    /// Read back every record of one file (admin tooling, tests)
    pub async fn read_all<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.dir.join(file);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        tokio::fs::read_to_string(&path)
            .await?
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(|e| eyre!("Corrupt ledger line: {}", e)))
            .collect()
    }
}

#[async_trait]
impl LedgerStore for JsonlLedger {
    async fn append_order(&self, order: &OrderRecord) -> Result<()> {
        self.append_line(ORDERS_FILE, order).await
    }

    async fn append_transaction(&self, record: &TransactionRecord) -> Result<()> {
        self.append_line(TRANSACTIONS_FILE, record).await
    }
}

/// In-memory ledger
#[derive(Default)]
pub struct MemoryLedger {
    orders: RwLock<Vec<OrderRecord>>,
    transactions: RwLock<Vec<TransactionRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<OrderRecord> {
        self.orders.read().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.transactions.read().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn append_order(&self, order: &OrderRecord) -> Result<()> {
        self.orders
            .write()
            .map_err(|_| eyre!("Ledger lock poisoned"))?
            .push(order.clone());
        Ok(())
    }

    async fn append_transaction(&self, record: &TransactionRecord) -> Result<()> {
        self.transactions
            .write()
            .map_err(|_| eyre!("Ledger lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}
