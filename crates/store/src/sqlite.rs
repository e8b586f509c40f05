//! SQLite attribute store.
//!
//! A single database file with three tables:
//! - `attribute_definitions` — the categories and their prompts
//! - `attribute_values` — append-only extracted observations
//! - `generation_log` — audit trail of backend interactions
//!
//! Timestamps are stored as RFC 3339 text. Values are never updated by
//! the pipeline; `sequence_id` ordering is what "latest" means.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keepsake_core::attribute::{AttributeDefinition, AttributeValue};
use keepsake_core::error::StoreError;
use keepsake_core::gateway::{GenerationLog, GenerationRecord};
use keepsake_core::store::AttributeStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// One row of the generation audit table.
#[derive(Debug, Clone)]
pub struct GenerationLogEntry {
    pub log_id: i64,
    pub logged_at: DateTime<Utc>,
    pub model: String,
    pub task: String,
    pub attribute: Option<String>,
    pub prompt: String,
    pub response: String,
    pub raw_response: Option<String>,
}

/// A production SQLite attribute store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from a file path.
    ///
    /// The database and all tables/indexes are created automatically.
    /// Pass `":memory:"` for an in-process ephemeral database (useful for
    /// tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Backend(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite attribute store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations — creates the three tables and indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attribute_definitions (
                definition_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                name              TEXT NOT NULL,
                extraction_prompt TEXT NOT NULL,
                judgment_prompt   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("attribute_definitions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attribute_values (
                sequence_id   INTEGER PRIMARY KEY AUTOINCREMENT,
                definition_id INTEGER NOT NULL
                    REFERENCES attribute_definitions(definition_id) ON DELETE CASCADE,
                content       TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("attribute_values table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS generation_log (
                log_id         INTEGER PRIMARY KEY AUTOINCREMENT,
                logged_at      TEXT NOT NULL,
                model          TEXT NOT NULL,
                task           TEXT NOT NULL,
                attribute_name TEXT,
                prompt         TEXT NOT NULL,
                response       TEXT NOT NULL,
                raw_response   TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("generation_log table: {e}")))?;

        // Latest-value lookups scan one definition newest-first
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_attribute_values_definition \
             ON attribute_values(definition_id, sequence_id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(format!("attribute_values index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse an `AttributeDefinition` from a SQLite row.
    fn row_to_definition(row: &sqlx::sqlite::SqliteRow) -> Result<AttributeDefinition, StoreError> {
        let id: i64 = row
            .try_get("definition_id")
            .map_err(|e| StoreError::Backend(format!("definition_id column: {e}")))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| StoreError::Backend(format!("name column: {e}")))?;
        let extraction_prompt: String = row
            .try_get("extraction_prompt")
            .map_err(|e| StoreError::Backend(format!("extraction_prompt column: {e}")))?;
        let judgment_prompt: String = row
            .try_get("judgment_prompt")
            .map_err(|e| StoreError::Backend(format!("judgment_prompt column: {e}")))?;

        Ok(AttributeDefinition {
            id,
            name,
            extraction_prompt,
            judgment_prompt,
        })
    }

    /// Parse an `AttributeValue` from a SQLite row.
    fn row_to_value(row: &sqlx::sqlite::SqliteRow) -> Result<AttributeValue, StoreError> {
        let sequence_id: i64 = row
            .try_get("sequence_id")
            .map_err(|e| StoreError::Backend(format!("sequence_id column: {e}")))?;
        let definition_id: i64 = row
            .try_get("definition_id")
            .map_err(|e| StoreError::Backend(format!("definition_id column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StoreError::Backend(format!("content column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::Backend(format!("created_at column: {e}")))?;
        let updated_at_str: String = row
            .try_get("updated_at")
            .map_err(|e| StoreError::Backend(format!("updated_at column: {e}")))?;

        Ok(AttributeValue {
            sequence_id,
            definition_id,
            content,
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }

    fn row_to_log_entry(row: &sqlx::sqlite::SqliteRow) -> Result<GenerationLogEntry, StoreError> {
        let log_id: i64 = row
            .try_get("log_id")
            .map_err(|e| StoreError::Backend(format!("log_id column: {e}")))?;
        let logged_at_str: String = row
            .try_get("logged_at")
            .map_err(|e| StoreError::Backend(format!("logged_at column: {e}")))?;
        let model: String = row
            .try_get("model")
            .map_err(|e| StoreError::Backend(format!("model column: {e}")))?;
        let task: String = row
            .try_get("task")
            .map_err(|e| StoreError::Backend(format!("task column: {e}")))?;
        let attribute: Option<String> = row
            .try_get("attribute_name")
            .map_err(|e| StoreError::Backend(format!("attribute_name column: {e}")))?;
        let prompt: String = row
            .try_get("prompt")
            .map_err(|e| StoreError::Backend(format!("prompt column: {e}")))?;
        let response: String = row
            .try_get("response")
            .map_err(|e| StoreError::Backend(format!("response column: {e}")))?;
        let raw_response: Option<String> = row
            .try_get("raw_response")
            .map_err(|e| StoreError::Backend(format!("raw_response column: {e}")))?;

        Ok(GenerationLogEntry {
            log_id,
            logged_at: parse_timestamp(&logged_at_str),
            model,
            task,
            attribute,
            prompt,
            response,
            raw_response,
        })
    }

    /// The newest audit rows, newest first.
    pub async fn recent_generations(
        &self,
        limit: i64,
    ) -> Result<Vec<GenerationLogEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM generation_log ORDER BY log_id DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("generation_log query: {e}")))?;

        rows.iter().map(Self::row_to_log_entry).collect()
    }

    /// Empties the audit table, returning the number of rows removed.
    pub async fn clear_generation_log(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM generation_log")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("generation_log clear: {e}")))?;
        Ok(result.rows_affected())
    }
}

fn parse_timestamp(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl AttributeStore for SqliteStore {
    async fn insert_definition(
        &self,
        definition: &AttributeDefinition,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attribute_definitions (name, extraction_prompt, judgment_prompt)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&definition.name)
        .bind(&definition.extraction_prompt)
        .bind(&definition.judgment_prompt)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("definition INSERT failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!("Stored attribute definition {id} ({})", definition.name);
        Ok(id)
    }

    async fn get_definition(&self, id: i64) -> Result<Option<AttributeDefinition>, StoreError> {
        let row = sqlx::query("SELECT * FROM attribute_definitions WHERE definition_id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("definition GET failed: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_definition(r)?)),
            None => Ok(None),
        }
    }

    async fn list_definitions(&self) -> Result<Vec<AttributeDefinition>, StoreError> {
        let rows = sqlx::query("SELECT * FROM attribute_definitions ORDER BY definition_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("definition LIST failed: {e}")))?;

        rows.iter().map(Self::row_to_definition).collect()
    }

    async fn update_definition(
        &self,
        definition: &AttributeDefinition,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attribute_definitions
            SET name = ?1, extraction_prompt = ?2, judgment_prompt = ?3
            WHERE definition_id = ?4
            "#,
        )
        .bind(&definition.name)
        .bind(&definition.extraction_prompt)
        .bind(&definition.judgment_prompt)
        .bind(definition.id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("definition UPDATE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_definition(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM attribute_definitions WHERE definition_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("definition DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_value(&self, definition_id: i64, content: &str) -> Result<i64, StoreError> {
        if self.get_definition(definition_id).await?.is_none() {
            return Err(StoreError::NotFound(format!(
                "attribute definition {definition_id}"
            )));
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO attribute_values (definition_id, content, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(definition_id)
        .bind(content)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("value INSERT failed: {e}")))?;

        let sequence_id = result.last_insert_rowid();
        debug!("Stored attribute value {sequence_id} for definition {definition_id}");
        Ok(sequence_id)
    }

    async fn latest_value(
        &self,
        definition_id: i64,
    ) -> Result<Option<AttributeValue>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM attribute_values
            WHERE definition_id = ?1
            ORDER BY sequence_id DESC
            LIMIT 1
            "#,
        )
        .bind(definition_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("latest value query: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_value(r)?)),
            None => Ok(None),
        }
    }

    async fn values_for_definition(
        &self,
        definition_id: i64,
    ) -> Result<Vec<AttributeValue>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM attribute_values WHERE definition_id = ?1 ORDER BY sequence_id DESC",
        )
        .bind(definition_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("values query: {e}")))?;

        rows.iter().map(Self::row_to_value).collect()
    }

    async fn list_values(&self) -> Result<Vec<AttributeValue>, StoreError> {
        let rows = sqlx::query("SELECT * FROM attribute_values ORDER BY sequence_id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("value LIST failed: {e}")))?;

        rows.iter().map(Self::row_to_value).collect()
    }

    async fn update_value(&self, sequence_id: i64, content: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE attribute_values SET content = ?1, updated_at = ?2 WHERE sequence_id = ?3",
        )
        .bind(content)
        .bind(Utc::now().to_rfc3339())
        .bind(sequence_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("value UPDATE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_value(&self, sequence_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM attribute_values WHERE sequence_id = ?1")
            .bind(sequence_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("value DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl GenerationLog for SqliteStore {
    /// Best-effort audit write. Failures are logged and swallowed so a
    /// broken audit table can never fail a turn.
    async fn record(&self, record: GenerationRecord) {
        let raw_response = record
            .raw
            .as_ref()
            .and_then(|value| serde_json::to_string(value).ok());

        let result = sqlx::query(
            r#"
            INSERT INTO generation_log
                (logged_at, model, task, attribute_name, prompt, response, raw_response)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(record.received_at.to_rfc3339())
        .bind(&record.model)
        .bind(record.task.as_str())
        .bind(&record.attribute)
        .bind(&record.prompt)
        .bind(&record.response)
        .bind(&raw_response)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!("Failed to record generation audit row: {e}");
        }
    }
}
