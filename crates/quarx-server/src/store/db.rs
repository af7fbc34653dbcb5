use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use redb::{backends::InMemoryBackend, Database, ReadableTable, TableDefinition};

use super::error::StoreError;
use super::model::{LicenseRecord, SECONDS_PER_DAY};

const LICENSES: TableDefinition<&str, &[u8]> = TableDefinition::new("licenses");

/// Fixed key seeded at startup so a fresh deployment always has one usable
/// license, matching the original service's bootstrap record.
pub const TEST_LICENSE_KEY: &str = "TEST-API-KEY-1234-5678-9ABC";
pub const TEST_LICENSE_DAYS: i64 = 30;

/// License store backed by redb. Every mutation is a read-modify-write inside
/// a single write transaction; redb serializes writers, so two requests racing
/// on the same key cannot lose updates.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the durable store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).context("open redb database")?;
        Self::init(db)
    }

    /// Open a non-durable store for ephemeral deployments. State dies with
    /// the process.
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .context("create in-memory database")?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self> {
        // Ensure the table exists so later read transactions never race its
        // creation.
        let write_txn = db.begin_write().context("begin init write")?;
        write_txn
            .open_table(LICENSES)
            .context("create licenses table")?;
        write_txn.commit().context("commit init")?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Insert a new license. Fails with `DuplicateKey` if the key exists.
    pub fn create(
        &self,
        key: &str,
        license_type: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<LicenseRecord, StoreError> {
        let write_txn = self.db.begin_write().context("begin write")?;
        let rec = {
            let mut table = write_txn
                .open_table(LICENSES)
                .context("open licenses table")?;
            if table.get(key).context("read license")?.is_some() {
                return Err(StoreError::DuplicateKey);
            }
            let rec = LicenseRecord::new(key, license_type, expires_at, now);
            let bytes = encode(&rec)?;
            table.insert(key, bytes.as_slice()).context("insert license")?;
            rec
        };
        write_txn.commit().context("commit create")?;
        Ok(rec)
    }

    /// Pure read. Performs no expiry enforcement; `status` reports expired
    /// licenses rather than rejecting them.
    pub fn lookup(&self, key: &str) -> Result<LicenseRecord, StoreError> {
        let read_txn = self.db.begin_read().context("begin read")?;
        let table = read_txn
            .open_table(LICENSES)
            .context("open licenses table")?;
        let guard = table
            .get(key)
            .context("read license")?
            .ok_or(StoreError::NotFound)?;
        Ok(decode(guard.value())?)
    }

    /// Expiry-checked read that stamps `last_checked_at`. An expired license
    /// fails with `Expired` and is left untouched.
    pub fn validate(&self, key: &str, now: i64) -> Result<LicenseRecord, StoreError> {
        self.mutate_live(key, now, |rec| rec.touch(now))
    }

    /// Expiry-checked activation. Idempotent: re-activating an already-used
    /// license succeeds and overwrites the user/hardware binding.
    pub fn activate(
        &self,
        key: &str,
        username: Option<&str>,
        hardware_id: Option<&str>,
        now: i64,
    ) -> Result<LicenseRecord, StoreError> {
        self.mutate_live(key, now, |rec| rec.activate(username, hardware_id, now))
    }

    /// Ensure the fixed test license exists with a 30-day expiry from `now`.
    /// An already-seeded record is returned as-is, so activation state
    /// survives restarts in durable mode.
    pub fn seed_test_license(&self, now: i64) -> Result<LicenseRecord, StoreError> {
        let expires_at = now + TEST_LICENSE_DAYS * SECONDS_PER_DAY;
        match self.create(TEST_LICENSE_KEY, "test", expires_at, now) {
            Err(StoreError::DuplicateKey) => self.lookup(TEST_LICENSE_KEY),
            other => other,
        }
    }

    fn mutate_live<F>(&self, key: &str, now: i64, apply: F) -> Result<LicenseRecord, StoreError>
    where
        F: FnOnce(&mut LicenseRecord),
    {
        let write_txn = self.db.begin_write().context("begin write")?;
        let rec = {
            let mut table = write_txn
                .open_table(LICENSES)
                .context("open licenses table")?;
            let mut rec = {
                let guard = table
                    .get(key)
                    .context("read license")?
                    .ok_or(StoreError::NotFound)?;
                decode(guard.value())?
            };
            if rec.is_expired(now) {
                // Dropping the transaction uncommitted leaves the record
                // untouched.
                return Err(StoreError::Expired);
            }
            apply(&mut rec);
            let bytes = encode(&rec)?;
            table.insert(key, bytes.as_slice()).context("write license")?;
            rec
        };
        write_txn.commit().context("commit")?;
        Ok(rec)
    }
}

fn encode(rec: &LicenseRecord) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(rec, bincode::config::standard()).context("bincode encode license")
}

fn decode(bytes: &[u8]) -> Result<LicenseRecord> {
    let (rec, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .context("bincode decode license")?;
    Ok(rec)
}
