//! SQLite implementation of CredentialsRepository with encryption.
//!
//! The PAT or access token and the refresh token are encrypted. Method,
//! account, token type and expiry stay plaintext so they can be listed
//! without the master key.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use sercha_core::{
    AuthMethod, CredentialSecret, Credentials, CredentialsRepository, OAuthCredentials,
    PatCredentials,
};
use tokio::sync::Mutex;

use super::{parse_datetime, parse_optional_datetime};
use crate::crypto::FieldEncryptor;
use crate::Database;

const SELECT_COLUMNS: &str = "id, source_id, auth_method, account_identifier, secret_value, \
     refresh_token, token_type, expires_at, created_at, updated_at";

/// Raw row data extracted from SQLite before decryption.
struct RawCredentialsRow {
    id: String,
    source_id: String,
    auth_method: String,
    account_identifier: String,
    secret_value: String,          // Encrypted
    refresh_token: Option<String>, // Encrypted
    token_type: Option<String>,
    expires_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn extract_row(row: &rusqlite::Row) -> rusqlite::Result<RawCredentialsRow> {
    Ok(RawCredentialsRow {
        id: row.get(0)?,
        source_id: row.get(1)?,
        auth_method: row.get(2)?,
        account_identifier: row.get(3)?,
        secret_value: row.get(4)?,
        refresh_token: row.get(5)?,
        token_type: row.get(6)?,
        expires_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// SQLite-backed credentials repository with field-level encryption.
pub struct SqliteCredentialsRepository {
    db: Arc<Mutex<Database>>,
    encryptor: Arc<FieldEncryptor>,
}

impl SqliteCredentialsRepository {
    pub fn new(db: Arc<Mutex<Database>>, encryptor: Arc<FieldEncryptor>) -> Self {
        Self { db, encryptor }
    }

    fn build_credentials(&self, row: RawCredentialsRow) -> Result<Credentials> {
        let secret_value = self
            .encryptor
            .decrypt(&row.secret_value)
            .with_context(|| format!("Failed to decrypt credentials {}", row.id))?;

        let secret = match AuthMethod::parse(&row.auth_method) {
            Some(AuthMethod::Pat) => CredentialSecret::Pat(PatCredentials {
                token: secret_value,
            }),
            Some(AuthMethod::OAuth) => CredentialSecret::OAuth(OAuthCredentials {
                access_token: secret_value,
                refresh_token: self
                    .encryptor
                    .decrypt_optional(row.refresh_token.as_deref())
                    .context("Failed to decrypt refresh token")?,
                token_type: row.token_type.unwrap_or_else(|| "Bearer".to_string()),
                expiry: parse_optional_datetime(row.expires_at),
            }),
            _ => anyhow::bail!("Invalid auth method for credentials: {}", row.auth_method),
        };

        Ok(Credentials {
            id: row.id,
            source_id: row.source_id,
            account_identifier: row.account_identifier,
            secret,
            created_at: parse_datetime(&row.created_at),
            updated_at: parse_datetime(&row.updated_at),
        })
    }

    async fn find(&self, column: &str, value: &str) -> Result<Option<Credentials>> {
        let row = {
            let db = self.db.lock().await;
            db.connection()
                .query_row(
                    &format!("SELECT {} FROM credentials WHERE {} = ?1", SELECT_COLUMNS, column),
                    params![value],
                    extract_row,
                )
                .optional()?
        };
        row.map(|r| self.build_credentials(r)).transpose()
    }
}

#[async_trait]
impl CredentialsRepository for SqliteCredentialsRepository {
    async fn get(&self, id: &str) -> Result<Option<Credentials>> {
        self.find("id", id).await
    }

    async fn get_for_source(&self, source_id: &str) -> Result<Option<Credentials>> {
        self.find("source_id", source_id).await
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        let (secret_value, refresh_token, token_type, expires_at) = match &credentials.secret {
            CredentialSecret::Pat(pat) => (self.encryptor.encrypt(&pat.token)?, None, None, None),
            CredentialSecret::OAuth(tokens) => (
                self.encryptor.encrypt(&tokens.access_token)?,
                self.encryptor
                    .encrypt_optional(tokens.refresh_token.as_deref())?,
                Some(tokens.token_type.clone()),
                tokens.expiry.map(|e| e.to_rfc3339()),
            ),
        };

        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT INTO credentials (id, source_id, auth_method, account_identifier, secret_value, refresh_token, token_type, expires_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                auth_method = excluded.auth_method,
                account_identifier = excluded.account_identifier,
                secret_value = excluded.secret_value,
                refresh_token = excluded.refresh_token,
                token_type = excluded.token_type,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![
                credentials.id,
                credentials.source_id,
                credentials.secret.method().as_str(),
                credentials.account_identifier,
                secret_value,
                refresh_token,
                token_type,
                expires_at,
                credentials.created_at.to_rfc3339(),
                credentials.updated_at.to_rfc3339(),
            ],
        )?;
        tracing::debug!(
            credentials_id = %credentials.id,
            source_id = %credentials.source_id,
            "[Storage] Saved credentials"
        );
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM credentials WHERE id = ?1", params![id])?;
        Ok(())
    }
}
