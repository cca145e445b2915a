//! SQLite connection pool
//!
//! r2d2 pool of rusqlite connections with WAL journaling and a busy timeout
//! applied to every new connection.

use std::path::Path;
use std::time::Duration;

use mpauth_domain::Result as DomainResult;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{info, warn};

use crate::errors::InfraError;

/// r2d2 pool of SQLite connections
pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Pool sizing and timeouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlitePoolConfig {
    /// Maximum open connections
    pub max_size: u32,
    /// How long to wait for a free connection
    pub connection_timeout: Duration,
    /// SQLite busy timeout applied to each connection
    pub busy_timeout: Duration,
}

impl Default for SqlitePoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Open (creating if needed) the database at `path` behind a pool.
///
/// # Errors
/// Returns `GatewayError::Database` if the file cannot be opened or the
/// pool cannot hand out a first connection.
pub fn create_pool(path: &Path, config: &SqlitePoolConfig) -> DomainResult<SqlitePool> {
    info!(db_path = %path.display(), pool_size = config.max_size, "opening SQLite pool");

    let busy_timeout = config.busy_timeout;
    let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    });

    Pool::builder()
        .max_size(config.max_size)
        .connection_timeout(config.connection_timeout)
        .build(manager)
        .map_err(|e| {
            warn!(error = %e, "failed to create connection pool");
            InfraError::from(e).into()
        })
}
