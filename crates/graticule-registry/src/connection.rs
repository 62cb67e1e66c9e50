//! SQLite connection management for the reference dataset
//!
//! Uses a simple Arc<Mutex<Connection>> wrapper. The store is read-mostly:
//! many concurrent resolutions may share one connection, each lookup taking
//! the mutex for the duration of a single query.

use crate::error::{FactoryError, FactoryResult};
use crate::schema;
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for opening a registry store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub path: PathBuf,
    /// Entries kept in the constructed-entity cache.
    pub cache_size: usize,
    pub busy_timeout_ms: u32,
}

impl RegistryConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// In-memory store for tests and staging.
    pub fn memory() -> Self {
        Self::new(":memory:")
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            cache_size: 512,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Thread-safe connection wrapper over the reference dataset.
#[derive(Clone)]
pub struct RegistryPool {
    conn: Arc<Mutex<Connection>>,
    config: RegistryConfig,
}

impl RegistryPool {
    /// Open (and if needed initialize) a registry store.
    pub fn new(config: RegistryConfig) -> FactoryResult<Self> {
        info!(path = ?config.path, "Opening registry store");

        let conn = if config.path.to_str() == Some(":memory:") {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    FactoryError::Session(format!("Failed to create directory: {}", e))
                })?;
            }
            Connection::open(&config.path)?
        };

        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        };
        pool.initialize()?;
        Ok(pool)
    }

    /// In-memory pool for tests.
    pub fn memory() -> FactoryResult<Self> {
        Self::new(RegistryConfig::memory())
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Execute a closure with the connection.
    pub fn with_connection<F, T>(&self, f: F) -> FactoryResult<T>
    where
        F: FnOnce(&Connection) -> FactoryResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    fn initialize(&self) -> FactoryResult<()> {
        self.with_connection(|conn| {
            self.configure_pragmas(conn)?;
            schema::apply_migrations(conn)?;
            info!("Registry store initialized");
            Ok(())
        })
    }

    fn configure_pragmas(&self, conn: &Connection) -> FactoryResult<()> {
        debug!("Configuring registry pragmas");
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};",
            self.config.busy_timeout_ms
        ))?;
        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_pool() {
        let pool = RegistryPool::memory().expect("memory pool");
        pool.with_connection(|conn| {
            let two: i64 = conn.query_row("SELECT 1 + 1", [], |row| row.get(0))?;
            assert_eq!(two, 2);
            Ok(())
        })
        .expect("query");
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RegistryConfig {
            path: PathBuf::from("/var/lib/graticule/registry.db"),
            cache_size: 128,
            busy_timeout_ms: 1_000,
        };
        let text = serde_json::to_string(&config).unwrap();
        let restored: RegistryConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(restored.path, config.path);
        assert_eq!(restored.cache_size, 128);
        assert_eq!(restored.busy_timeout_ms, 1_000);
    }

    #[test]
    fn file_pool_applies_schema() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = RegistryPool::new(RegistryConfig::new(dir.path().join("registry.db")))
            .expect("file pool");
        pool.with_connection(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='geodetic_crs'",
                [],
                |row| row.get(0),
            )?;
            assert_eq!(n, 1);
            Ok(())
        })
        .expect("query");
    }
}
