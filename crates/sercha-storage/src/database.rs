//! SQLite connection and schema migrations
//!
//! Plain SQLite; secret columns are encrypted by the repositories through
//! [`FieldEncryptor`](crate::FieldEncryptor) before they reach this layer.
//!
//! Migrations live in `migrations/NNN_name.sql`, are listed in [`MIGRATIONS`]
//! and run once each, in order, recorded in `schema_migrations`.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, error, info};

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial",
    sql: include_str!("migrations/001_initial.sql"),
}];

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and apply pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        debug!("[Storage] Opened database at {:?}", path);
        Self::init(conn)
    }

    /// Fresh in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        debug!("[Storage] Opened in-memory database");
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Credentials cascade with their source
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current = self.get_schema_version();
        let latest = MIGRATIONS.last().map(|m| m.version).unwrap_or(0);
        debug!("[Storage] Schema version {}, latest {}", current, latest);

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            info!(
                "[Storage] Applying migration {} ({})",
                migration.version, migration.name
            );

            let tx = self.conn.unchecked_transaction()?;
            if let Err(e) = self.conn.execute_batch(migration.sql) {
                error!(
                    "[Storage] Migration {} ({}) failed: {}",
                    migration.version, migration.name, e
                );
                anyhow::bail!(
                    "Failed to run migration {} ({}): {}",
                    migration.version,
                    migration.name,
                    e
                );
            }
            self.conn.execute(
                "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, datetime('now'))",
                rusqlite::params![migration.version, migration.name],
            )?;
            tx.commit()?;
        }

        Ok(())
    }

    /// Highest applied migration, 0 for a new database.
    pub fn get_schema_version(&self) -> i64 {
        self.conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` in a transaction, committing only on `Ok`.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let result = f(&self.conn)?;
        tx.commit()?;
        Ok(result)
    }
}
