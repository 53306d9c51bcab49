//! Sercha Storage Layer
//!
//! SQLite database with field-level encryption for client secrets and tokens.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 sercha-core services                 │
//! ├──────────────────────────────────────────────────────┤
//! │               Repository Traits                      │
//! │   (SourceRepository, CredentialsRepository, etc.)    │
//! ├──────────────────────────────────────────────────────┤
//! │            SQLite Implementations                    │
//! │  (SqliteSourceRepository, SqliteCredentialsRepo)     │
//! ├──────────────────────────────────────────────────────┤
//! │         FieldEncryptor (AES-256-GCM)                 │
//! ├──────────────────────────────────────────────────────┤
//! │          KeychainKeyProvider (OS keychain)           │
//! ├──────────────────────────────────────────────────────┤
//! │                   Database (SQLite)                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use sercha_storage::{
//!     Database, FieldEncryptor, KeychainKeyProvider, SqliteCredentialsRepository,
//!     SqliteSourceRepository,
//! };
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! let key_provider = KeychainKeyProvider::new()?;
//! let encryptor = Arc::new(FieldEncryptor::from_key_provider(&key_provider)?);
//!
//! let db = Arc::new(Mutex::new(Database::open(&path)?));
//! let sources = SqliteSourceRepository::new(db.clone());
//! let credentials = SqliteCredentialsRepository::new(db, encryptor);
//! ```

pub mod crypto;
mod database;
pub mod keychain;
mod repositories;

pub use crypto::{generate_master_key, FieldEncryptor, KEY_SIZE};
pub use database::Database;
pub use keychain::{KeychainKeyProvider, MasterKeyProvider, MemoryKeyProvider};
pub use repositories::*;

/// Default database file name.
pub const DATABASE_FILE: &str = "sercha.db";

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| p.join(sercha_core::branding::APP_NAME).join(DATABASE_FILE))
}
