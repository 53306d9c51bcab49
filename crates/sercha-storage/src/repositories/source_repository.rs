//! SQLite implementation of SourceRepository.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use sercha_core::{Source, SourceRepository};
use tokio::sync::Mutex;

use super::{non_empty, parse_datetime};
use crate::Database;

const SELECT_COLUMNS: &str =
    "id, source_type, name, config, auth_provider_id, credentials_id, created_at, updated_at";

struct RawSourceRow {
    id: String,
    source_type: String,
    name: String,
    config: String,
    auth_provider_id: Option<String>,
    credentials_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawSourceRow {
    fn extract(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_type: row.get(1)?,
            name: row.get(2)?,
            config: row.get(3)?,
            auth_provider_id: row.get(4)?,
            credentials_id: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_source(self) -> Result<Source> {
        let config: HashMap<String, String> = serde_json::from_str(&self.config)
            .with_context(|| format!("Invalid config JSON for source {}", self.id))?;
        Ok(Source {
            id: self.id,
            source_type: self.source_type,
            name: self.name,
            config,
            auth_provider_id: self.auth_provider_id.unwrap_or_default(),
            credentials_id: self.credentials_id.unwrap_or_default(),
            created_at: parse_datetime(&self.created_at),
            updated_at: parse_datetime(&self.updated_at),
        })
    }
}

/// SQLite-backed source repository. Config is stored as a JSON object.
pub struct SqliteSourceRepository {
    db: Arc<Mutex<Database>>,
}

impl SqliteSourceRepository {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SourceRepository for SqliteSourceRepository {
    async fn list(&self) -> Result<Vec<Source>> {
        let db = self.db.lock().await;
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {} FROM sources ORDER BY created_at ASC, name ASC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], RawSourceRow::extract)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawSourceRow::into_source).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<Source>> {
        let db = self.db.lock().await;
        let row = db
            .connection()
            .query_row(
                &format!("SELECT {} FROM sources WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                RawSourceRow::extract,
            )
            .optional()?;
        row.map(RawSourceRow::into_source).transpose()
    }

    async fn list_by_auth_provider(&self, auth_provider_id: &str) -> Result<Vec<Source>> {
        let db = self.db.lock().await;
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {} FROM sources WHERE auth_provider_id = ?1 ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![auth_provider_id], RawSourceRow::extract)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawSourceRow::into_source).collect()
    }

    async fn save(&self, source: &Source) -> Result<()> {
        let config = serde_json::to_string(&source.config)?;
        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT INTO sources (id, source_type, name, config, auth_provider_id, credentials_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                source_type = excluded.source_type,
                name = excluded.name,
                config = excluded.config,
                auth_provider_id = excluded.auth_provider_id,
                credentials_id = excluded.credentials_id,
                updated_at = excluded.updated_at",
            params![
                source.id,
                source.source_type,
                source.name,
                config,
                non_empty(&source.auth_provider_id),
                non_empty(&source.credentials_id),
                source.created_at.to_rfc3339(),
                source.updated_at.to_rfc3339(),
            ],
        )?;
        tracing::debug!(source_id = %source.id, "[Storage] Saved source");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM sources WHERE id = ?1", params![id])?;
        Ok(())
    }
}
