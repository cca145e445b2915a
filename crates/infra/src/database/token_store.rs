//! SQLite-backed token store.
//!
//! Implements the `TokenStore` trait for durable per-user token records.
//! All database operations run in `spawn_blocking` to avoid blocking the
//! async runtime.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mpauth_common::auth::{AuthError, TokenRecord, TokenStore};
use mpauth_domain::{GatewayError, Result as DomainResult};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;

use super::pool::{create_pool, SqlitePool, SqlitePoolConfig};
use crate::errors::{map_join_error, InfraError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS oauth_tokens (
    user_id        TEXT PRIMARY KEY NOT NULL,
    access_token   TEXT NOT NULL,
    refresh_token  TEXT,
    token_type     TEXT NOT NULL,
    expires_in     INTEGER NOT NULL,
    scope          TEXT,
    remote_user_id INTEGER,
    obtained_at_ms INTEGER NOT NULL,
    updated_at     INTEGER NOT NULL
);
";

/// Durable token store.
///
/// One row per user; `put` upserts so a refresh replaces the previous pair
/// in a single statement.
#[derive(Debug, Clone)]
pub struct SqliteTokenStore {
    pool: Arc<SqlitePool>,
}

impl SqliteTokenStore {
    /// Open the store at `path` with default pool settings, creating the
    /// schema if needed.
    pub fn open(path: impl AsRef<Path>) -> DomainResult<Self> {
        Self::open_with_config(path, &SqlitePoolConfig::default())
    }

    /// Open with explicit pool settings
    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: &SqlitePoolConfig,
    ) -> DomainResult<Self> {
        let pool = create_pool(path.as_ref(), config)?;
        {
            let conn = pool.get().map_err(InfraError::from)?;
            conn.execute_batch(SCHEMA).map_err(InfraError::from)?;
        }
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Load the record for `user_id`, if any.
    pub async fn load(&self, user_id: &str) -> DomainResult<Option<TokenRecord>> {
        let pool = Arc::clone(&self.pool);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<TokenRecord>> {
            let conn = pool.get().map_err(InfraError::from)?;
            query_record(&conn, &user_id)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Insert or replace the record for `user_id`.
    pub async fn save(&self, user_id: &str, record: TokenRecord) -> DomainResult<()> {
        let pool = Arc::clone(&self.pool);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = pool.get().map_err(InfraError::from)?;
            upsert_record(&conn, &user_id, &record)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Delete the record for `user_id`. Returns whether a row existed.
    pub async fn delete(&self, user_id: &str) -> DomainResult<bool> {
        let pool = Arc::clone(&self.pool);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = pool.get().map_err(InfraError::from)?;
            let removed = conn
                .execute("DELETE FROM oauth_tokens WHERE user_id = ?1", params![user_id])
                .map_err(InfraError::from)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Number of users with a stored record.
    pub async fn count(&self) -> DomainResult<usize> {
        let pool = Arc::clone(&self.pool);

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = pool.get().map_err(InfraError::from)?;
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM oauth_tokens", [], |row| row.get(0))
                .map_err(InfraError::from)?;
            usize::try_from(count)
                .map_err(|_| GatewayError::Database(format!("invalid row count: {count}")))
        })
        .await
        .map_err(map_join_error)?
    }
}

fn storage_error(err: GatewayError) -> AuthError {
    AuthError::Storage(err.to_string())
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, AuthError> {
        self.load(user_id).await.map_err(storage_error)
    }

    async fn put(&self, user_id: &str, record: TokenRecord) -> Result<(), AuthError> {
        self.save(user_id, record).await.map_err(storage_error)
    }

    async fn remove(&self, user_id: &str) -> Result<(), AuthError> {
        self.delete(user_id).await.map(|_| ()).map_err(storage_error)
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

struct TokenRow {
    access_token: String,
    refresh_token: Option<String>,
    token_type: String,
    expires_in: i64,
    scope: Option<String>,
    remote_user_id: Option<i64>,
    obtained_at_ms: i64,
}

impl TokenRow {
    fn into_record(self) -> DomainResult<TokenRecord> {
        let obtained_at =
            DateTime::<Utc>::from_timestamp_millis(self.obtained_at_ms).ok_or_else(|| {
                GatewayError::Database(format!(
                    "obtained_at out of range: {}",
                    self.obtained_at_ms
                ))
            })?;

        Ok(TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
            scope: self.scope,
            remote_user_id: self.remote_user_id,
            obtained_at,
        })
    }
}

fn query_record(conn: &Connection, user_id: &str) -> DomainResult<Option<TokenRecord>> {
    let row = conn
        .query_row(
            "SELECT access_token, refresh_token, token_type, expires_in, scope,
                    remote_user_id, obtained_at_ms
             FROM oauth_tokens WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(TokenRow {
                    access_token: row.get(0)?,
                    refresh_token: row.get(1)?,
                    token_type: row.get(2)?,
                    expires_in: row.get(3)?,
                    scope: row.get(4)?,
                    remote_user_id: row.get(5)?,
                    obtained_at_ms: row.get(6)?,
                })
            },
        )
        .optional()
        .map_err(InfraError::from)?;

    row.map(TokenRow::into_record).transpose()
}

fn upsert_record(conn: &Connection, user_id: &str, record: &TokenRecord) -> DomainResult<()> {
    let now = Utc::now().timestamp();

    conn.execute(
        "INSERT INTO oauth_tokens (
             user_id, access_token, refresh_token, token_type, expires_in, scope,
             remote_user_id, obtained_at_ms, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(user_id) DO UPDATE SET
             access_token = excluded.access_token,
             refresh_token = excluded.refresh_token,
             token_type = excluded.token_type,
             expires_in = excluded.expires_in,
             scope = excluded.scope,
             remote_user_id = excluded.remote_user_id,
             obtained_at_ms = excluded.obtained_at_ms,
             updated_at = excluded.updated_at",
        params![
            user_id,
            record.access_token,
            record.refresh_token,
            record.token_type,
            record.expires_in,
            record.scope,
            record.remote_user_id,
            record.obtained_at.timestamp_millis(),
            now,
        ],
    )
    .map_err(InfraError::from)?;

    Ok(())
}
