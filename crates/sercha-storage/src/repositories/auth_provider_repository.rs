//! SQLite implementation of AuthProviderRepository.
//!
//! The client secret is encrypted; ids, endpoints and scopes are plaintext.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use sercha_core::{AuthMethod, AuthProvider, AuthProviderRepository, OAuthProviderConfig, ProviderType};
use tokio::sync::Mutex;

use super::parse_datetime;
use crate::crypto::FieldEncryptor;
use crate::Database;

const SELECT_COLUMNS: &str = "id, name, provider_type, auth_method, client_id, client_secret, \
     auth_url, token_url, scopes, created_at, updated_at";

struct RawProviderRow {
    id: String,
    name: String,
    provider_type: String,
    auth_method: String,
    client_id: Option<String>,
    client_secret: Option<String>, // Encrypted
    auth_url: Option<String>,
    token_url: Option<String>,
    scopes: String,
    created_at: String,
    updated_at: String,
}

fn extract_row(row: &rusqlite::Row) -> rusqlite::Result<RawProviderRow> {
    Ok(RawProviderRow {
        id: row.get(0)?,
        name: row.get(1)?,
        provider_type: row.get(2)?,
        auth_method: row.get(3)?,
        client_id: row.get(4)?,
        client_secret: row.get(5)?,
        auth_url: row.get(6)?,
        token_url: row.get(7)?,
        scopes: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub struct SqliteAuthProviderRepository {
    db: Arc<Mutex<Database>>,
    encryptor: Arc<FieldEncryptor>,
}

impl SqliteAuthProviderRepository {
    pub fn new(db: Arc<Mutex<Database>>, encryptor: Arc<FieldEncryptor>) -> Self {
        Self { db, encryptor }
    }

    fn build_provider(&self, row: RawProviderRow) -> Result<AuthProvider> {
        let provider_type = ProviderType::parse(&row.provider_type)
            .ok_or_else(|| anyhow::anyhow!("Unknown provider type: {}", row.provider_type))?;
        let auth_method = AuthMethod::parse(&row.auth_method)
            .ok_or_else(|| anyhow::anyhow!("Unknown auth method: {}", row.auth_method))?;

        let oauth = match row.client_id {
            Some(client_id) => Some(OAuthProviderConfig {
                client_id,
                client_secret: self
                    .encryptor
                    .decrypt_optional(row.client_secret.as_deref())
                    .context("Failed to decrypt client secret")?
                    .unwrap_or_default(),
                auth_url: row.auth_url.unwrap_or_default(),
                token_url: row.token_url.unwrap_or_default(),
                scopes: serde_json::from_str(&row.scopes)
                    .with_context(|| format!("Invalid scopes for auth provider {}", row.id))?,
            }),
            None => None,
        };

        Ok(AuthProvider {
            id: row.id,
            name: row.name,
            provider_type,
            auth_method,
            oauth,
            created_at: parse_datetime(&row.created_at),
            updated_at: parse_datetime(&row.updated_at),
        })
    }

    async fn query(&self, sql: &str, param: Option<&str>) -> Result<Vec<AuthProvider>> {
        let rows = {
            let db = self.db.lock().await;
            let mut stmt = db.connection().prepare(sql)?;
            let rows = match param {
                Some(p) => stmt.query_map(params![p], extract_row)?.collect::<Result<Vec<_>, _>>()?,
                None => stmt.query_map([], extract_row)?.collect::<Result<Vec<_>, _>>()?,
            };
            rows
        };
        rows.into_iter().map(|r| self.build_provider(r)).collect()
    }
}

#[async_trait]
impl AuthProviderRepository for SqliteAuthProviderRepository {
    async fn list(&self) -> Result<Vec<AuthProvider>> {
        self.query(
            &format!("SELECT {} FROM auth_providers ORDER BY created_at ASC, name ASC", SELECT_COLUMNS),
            None,
        )
        .await
    }

    async fn list_by_provider(&self, provider_type: ProviderType) -> Result<Vec<AuthProvider>> {
        self.query(
            &format!(
                "SELECT {} FROM auth_providers WHERE provider_type = ?1 ORDER BY created_at ASC, name ASC",
                SELECT_COLUMNS
            ),
            Some(provider_type.as_str()),
        )
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<AuthProvider>> {
        let row = {
            let db = self.db.lock().await;
            db.connection()
                .query_row(
                    &format!("SELECT {} FROM auth_providers WHERE id = ?1", SELECT_COLUMNS),
                    params![id],
                    extract_row,
                )
                .optional()?
        };
        row.map(|r| self.build_provider(r)).transpose()
    }

    async fn save(&self, provider: &AuthProvider) -> Result<()> {
        let oauth = provider.oauth.as_ref();
        let client_secret = self
            .encryptor
            .encrypt_optional(oauth.map(|o| o.client_secret.as_str()))
            .context("Failed to encrypt client secret")?;
        let scopes = serde_json::to_string(&oauth.map(|o| o.scopes.clone()).unwrap_or_default())?;

        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT INTO auth_providers (id, name, provider_type, auth_method, client_id, client_secret, auth_url, token_url, scopes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                provider_type = excluded.provider_type,
                auth_method = excluded.auth_method,
                client_id = excluded.client_id,
                client_secret = excluded.client_secret,
                auth_url = excluded.auth_url,
                token_url = excluded.token_url,
                scopes = excluded.scopes,
                updated_at = excluded.updated_at",
            params![
                provider.id,
                provider.name,
                provider.provider_type.as_str(),
                provider.auth_method.as_str(),
                oauth.map(|o| o.client_id.as_str()),
                client_secret,
                oauth.map(|o| o.auth_url.as_str()),
                oauth.map(|o| o.token_url.as_str()),
                scopes,
                provider.created_at.to_rfc3339(),
                provider.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM auth_providers WHERE id = ?1", params![id])?;
        Ok(())
    }
}
