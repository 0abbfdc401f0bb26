//! Ledger persistence substrate
//!
//! The ledger hands every mutation to a `LedgerStore` as a list of
//! `LedgerChange`s and only applies it in memory once `commit` returned `Ok`.
//! Each backend makes a commit all-or-nothing:
//! - `JsonFileStore` writes a temporary file and renames it over the old one
//! - `RocksLedgerStore` writes one synced `WriteBatch`
//! - `MemoryLedgerStore` swaps an in-process snapshot

use crate::config::{StorageBackend, StorageConfig};
use crate::errors::{ArcadeResult, StorageError};
use crate::wallet::{Credits, Escrow, EscrowId, UserId};
use rocksdb::{Options, WriteBatch, WriteOptions, DB};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

const WALLET_PREFIX: &str = "wallet:";
const ESCROW_PREFIX: &str = "escrow:";

/// One durable change produced by a ledger operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerChange {
    PutWallet { user: UserId, balance: Credits },
    PutEscrow(Escrow),
    DeleteEscrow(EscrowId),
}

/// Full ledger contents as stored on disk
///
/// Serialised in the legacy `user_wallets.json` layout, so existing wallet
/// files load as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub wallets: BTreeMap<UserId, Credits>,
    #[serde(default, rename = "active_bets")]
    pub escrows: BTreeMap<EscrowId, Escrow>,
}

impl LedgerSnapshot {
    pub fn apply(&mut self, changes: &[LedgerChange]) {
        for change in changes {
            match change {
                LedgerChange::PutWallet { user, balance } => {
                    self.wallets.insert(*user, *balance);
                }
                LedgerChange::PutEscrow(escrow) => {
                    self.escrows.insert(escrow.id.clone(), escrow.clone());
                }
                LedgerChange::DeleteEscrow(id) => {
                    self.escrows.remove(id);
                }
            }
        }
    }

    /// Changes that rebuild this snapshot in an empty store
    pub fn to_changes(&self) -> Vec<LedgerChange> {
        let wallets = self
            .wallets
            .iter()
            .map(|(&user, &balance)| LedgerChange::PutWallet { user, balance });
        let escrows = self.escrows.values().cloned().map(LedgerChange::PutEscrow);
        wallets.chain(escrows).collect()
    }

    /// Escrow ids are map keys on disk; older files do not repeat them inside the record
    fn normalize_escrow_ids(&mut self) {
        for (id, escrow) in self.escrows.iter_mut() {
            if escrow.id != *id {
                escrow.id = id.clone();
            }
        }
    }
}

/// Durable home of wallet balances and open escrows
pub trait LedgerStore: Send + Sync {
    /// Read everything persisted so far
    fn load(&self) -> ArcadeResult<LedgerSnapshot>;

    /// Persist a set of changes atomically
    fn commit(&self, changes: &[LedgerChange]) -> ArcadeResult<()>;

    /// Human readable location, for logs
    fn describe(&self) -> String;
}

/// Open the store selected by configuration
pub fn open_store(config: &StorageConfig) -> ArcadeResult<Arc<dyn LedgerStore>> {
    let store: Arc<dyn LedgerStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryLedgerStore::new()),
        StorageBackend::Json => Arc::new(JsonFileStore::new(&config.path)),
        StorageBackend::Rocksdb => Arc::new(RocksLedgerStore::open(&config.path)?),
    };
    debug!(store = %store.describe(), "Opened ledger store");
    Ok(store)
}

/// In-process store; `fail_writes` simulates a broken disk
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    snapshot: Mutex<LedgerSnapshot>,
    fail_writes: AtomicBool,
    commits: AtomicU64,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Make every following commit fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful commits
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> ArcadeResult<LedgerSnapshot> {
        Ok(self.snapshot())
    }

    fn commit(&self, changes: &[LedgerChange]) -> ArcadeResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed("memory store is failing writes".to_string()).into());
        }
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .apply(changes);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Whole-ledger JSON document, replaced atomically on every commit
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Last successfully written contents; serialises writers
    current: Mutex<Option<LedgerSnapshot>>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            current: Mutex::new(None),
        }
    }

    fn read_file(&self) -> ArcadeResult<LedgerSnapshot> {
        if !self.path.exists() {
            return Ok(LedgerSnapshot::default());
        }

        let bytes = std::fs::read(&self.path).map_err(StorageError::from)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(LedgerSnapshot::default());
        }

        let mut snapshot: LedgerSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::CorruptedData(format!("Failed to decode {}: {}", self.path.display(), e))
        })?;
        snapshot.normalize_escrow_ids();
        Ok(snapshot)
    }

    fn write_file(&self, snapshot: &LedgerSnapshot) -> ArcadeResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to encode ledger: {}", e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        tmp.write_all(&bytes)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| StorageError::WriteFailed(e.error.to_string()))?;
        Ok(())
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> ArcadeResult<LedgerSnapshot> {
        let snapshot = self.read_file()?;
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn commit(&self, changes: &[LedgerChange]) -> ArcadeResult<()> {
        let mut current = self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = match current.as_ref() {
            Some(snapshot) => snapshot.clone(),
            None => self.read_file()?,
        };
        next.apply(changes);
        self.write_file(&next)?;
        *current = Some(next);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// RocksDB keyspace with one key per wallet and per open escrow
#[derive(Clone)]
pub struct RocksLedgerStore {
    db: Arc<DB>,
    path: PathBuf,
}

impl RocksLedgerStore {
    pub fn open<P: AsRef<Path>>(path: P) -> ArcadeResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path.as_ref())
            .map_err(|e| StorageError::DatabaseOpenFailed(e.to_string()))?;
        Ok(Self {
            db: Arc::new(db),
            path: path.as_ref().to_path_buf(),
        })
    }

    fn wallet_key(user: UserId) -> Vec<u8> {
        format!("{}{}", WALLET_PREFIX, user).into_bytes()
    }

    fn escrow_key(id: &str) -> Vec<u8> {
        format!("{}{}", ESCROW_PREFIX, id).into_bytes()
    }

    fn scan_prefix(&self, prefix: &str) -> ArcadeResult<Vec<(String, Vec<u8>)>> {
        let mut rows = Vec::new();
        for item in self.db.prefix_iterator(prefix.as_bytes()) {
            let (key, value) = item.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let suffix = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            rows.push((suffix, value.to_vec()));
        }
        Ok(rows)
    }
}

impl LedgerStore for RocksLedgerStore {
    fn load(&self) -> ArcadeResult<LedgerSnapshot> {
        let mut snapshot = LedgerSnapshot::default();

        for (suffix, value) in self.scan_prefix(WALLET_PREFIX)? {
            let user: UserId = suffix
                .parse()
                .map_err(|_| StorageError::CorruptedData(format!("Invalid wallet key {}", suffix)))?;
            let balance: Credits = serde_json::from_slice(&value).map_err(|e| {
                StorageError::CorruptedData(format!("Failed to decode wallet {}: {}", user, e))
            })?;
            snapshot.wallets.insert(user, balance);
        }

        for (id, value) in self.scan_prefix(ESCROW_PREFIX)? {
            let escrow: Escrow = serde_json::from_slice(&value).map_err(|e| {
                StorageError::CorruptedData(format!("Failed to decode escrow {}: {}", id, e))
            })?;
            snapshot.escrows.insert(id, escrow);
        }

        snapshot.normalize_escrow_ids();
        Ok(snapshot)
    }

    fn commit(&self, changes: &[LedgerChange]) -> ArcadeResult<()> {
        let mut batch = WriteBatch::default();
        for change in changes {
            match change {
                LedgerChange::PutWallet { user, balance } => {
                    let bytes = serde_json::to_vec(balance)
                        .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
                    batch.put(Self::wallet_key(*user), bytes);
                }
                LedgerChange::PutEscrow(escrow) => {
                    let bytes = serde_json::to_vec(escrow).map_err(|e| {
                        StorageError::WriteFailed(format!("Failed to encode escrow {}: {}", escrow.id, e))
                    })?;
                    batch.put(Self::escrow_key(&escrow.id), bytes);
                }
                LedgerChange::DeleteEscrow(id) => batch.delete(Self::escrow_key(id)),
            }
        }

        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        self.db
            .write_opt(batch, &opts)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("rocksdb:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_changes() -> Vec<LedgerChange> {
        vec![
            LedgerChange::PutWallet { user: 1, balance: 900 },
            LedgerChange::PutWallet { user: 2, balance: 900 },
            LedgerChange::PutEscrow(Escrow::new("GAME01".to_string(), 1, 100)),
        ]
    }

    #[test]
    fn test_memory_store_failure_switch() {
        let store = MemoryLedgerStore::new();
        store.commit(&sample_changes()).expect("commit");
        assert_eq!(store.commit_count(), 1);

        store.set_fail_writes(true);
        assert!(store.commit(&[LedgerChange::DeleteEscrow("GAME01".to_string())]).is_err());
        assert!(store.snapshot().escrows.contains_key("GAME01"));
    }

    #[test]
    fn test_json_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("wallets.json");

        let store = JsonFileStore::new(&path);
        assert_eq!(store.load().expect("load"), LedgerSnapshot::default());
        store.commit(&sample_changes()).expect("commit");
        store
            .commit(&[LedgerChange::DeleteEscrow("GAME01".to_string())])
            .expect("commit");

        let reopened = JsonFileStore::new(&path).load().expect("reload");
        assert_eq!(reopened.wallets.get(&1), Some(&900));
        assert!(reopened.escrows.is_empty());
    }

    #[test]
    fn test_json_store_reads_legacy_wallet_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("user_wallets.json");
        std::fs::write(
            &path,
            r#"{
              "wallets": {"11": 1000, "12": 400},
              "active_bets": {
                "XY12AB": {"creator_id": 12, "amount": 100, "participants": {"12": 100}}
              }
            }"#,
        )
        .expect("write legacy");

        let snapshot = JsonFileStore::new(&path).load().expect("load");
        assert_eq!(snapshot.wallets.get(&12), Some(&400));
        assert_eq!(snapshot.escrows["XY12AB"].id, "XY12AB");
        assert_eq!(snapshot.escrows["XY12AB"].pot(), 100);
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").expect("write");

        assert!(JsonFileStore::new(&path).load().is_err());
    }

    #[test]
    fn test_rocks_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = RocksLedgerStore::open(dir.path()).expect("open");
            store.commit(&sample_changes()).expect("commit");
            store
                .commit(&[
                    LedgerChange::PutWallet { user: 2, balance: 1000 },
                    LedgerChange::DeleteEscrow("GAME01".to_string()),
                ])
                .expect("commit");
        }

        let store = RocksLedgerStore::open(dir.path()).expect("reopen");
        let snapshot = store.load().expect("load");
        assert_eq!(snapshot.wallets.get(&1), Some(&900));
        assert_eq!(snapshot.wallets.get(&2), Some(&1000));
        assert!(snapshot.escrows.is_empty());
    }

    #[test]
    fn test_snapshot_to_changes_rebuilds_it() {
        let mut original = LedgerSnapshot::default();
        original.apply(&sample_changes());

        let mut rebuilt = LedgerSnapshot::default();
        rebuilt.apply(&original.to_changes());
        assert_eq!(original, rebuilt);
    }
}
