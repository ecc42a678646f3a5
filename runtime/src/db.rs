//! Account state database backed by SQLite.
//!
//! Stores each account as its encoded record next to its kind tag, keyed
//! by hex address. Migration is applied inline via `include_str!` on first
//! open.

use std::path::Path;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::accounts::{Account, AccountKind, AccountStore, Address};

/// Persistent account state.
pub struct StateDb {
    pool: SqlitePool,
}

impl StateDb {
    /// Open (or create) the state database at the given path and apply migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migration fails.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create state db directory {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .pragma("trusted_schema", "OFF");

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open state db at {}", path.display()))?;

        let migration_sql = include_str!("../migrations/001_accounts.sql");
        sqlx::raw_sql(migration_sql)
            .execute(&pool)
            .await
            .context("failed to apply accounts schema migration")?;

        Ok(Self { pool })
    }

    /// Load every stored account.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or a row does not decode.
    pub async fn load_store(&self) -> anyhow::Result<AccountStore> {
        let rows: Vec<(String, String, Vec<u8>)> =
            sqlx::query_as("SELECT address, kind, data FROM accounts ORDER BY address")
                .fetch_all(&self.pool)
                .await
                .context("failed to query accounts")?;

        let mut store = AccountStore::new();
        for (address, kind, data) in rows {
            let addr = decode_address(&address)?;
            let kind = AccountKind::parse(&kind)
                .with_context(|| format!("unknown account kind {kind} at {address}"))?;
            let account = Account::decode(kind, &data)
                .with_context(|| format!("failed to decode account {address}"))?;
            store.put(addr, account);
        }
        Ok(store)
    }

    /// Persist every account in `store` in one database transaction.
    ///
    /// Accounts absent from `store` are left untouched; the program never
    /// closes accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; nothing is written in that case.
    pub async fn save_store(&self, store: &AccountStore) -> anyhow::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin state transaction")?;

        for (address, account) in store.iter() {
            sqlx::query(
                "INSERT INTO accounts (address, kind, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(address) DO UPDATE SET
                    kind = excluded.kind,
                    data = excluded.data,
                    updated_at = excluded.updated_at",
            )
            .bind(hex::encode(address))
            .bind(account.kind().as_str())
            .bind(account.encode())
            .bind(&now)
            .execute(&mut *tx)
            .await
            .context("failed to upsert account")?;
        }

        tx.commit().await.context("failed to commit state")?;
        Ok(())
    }

    /// Count stored accounts of one kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn count(&self, kind: AccountKind) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE kind = ?1")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await
            .context("failed to count accounts")?;
        Ok(count)
    }
}

fn decode_address(encoded: &str) -> anyhow::Result<Address> {
    let bytes = hex::decode(encoded).with_context(|| format!("bad address {encoded}"))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| anyhow::anyhow!("address {encoded} has {} bytes", v.len()))
}
