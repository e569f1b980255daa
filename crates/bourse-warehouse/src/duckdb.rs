//! `DuckDB` database handle and scoped connections.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use ::duckdb::{Config, Connection};

/// Path value that selects an in-memory database instead of a file.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Access mode the database is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only access. Schema bootstrap is skipped.
    ReadOnly,
    /// Read-write access.
    ReadWrite,
}

struct ManagerInner {
    db_path: PathBuf,
    mode: AccessMode,
    root: Mutex<Connection>,
}

/// Owns one database instance and hands out connections scoped to a single call.
///
/// Every connection is cloned from the same instance, so writes made through one
/// scoped connection are visible to the next one, including for in-memory stores.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<ManagerInner>,
}

impl DuckDbConnectionManager {
    /// Open the database at `path` (or in memory for [`IN_MEMORY_PATH`]).
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>, mode: AccessMode) -> Result<Self, ::duckdb::Error> {
        let db_path = path.into();
        let mode = if is_in_memory(db_path.as_path()) {
            // DuckDB refuses read-only in-memory instances.
            AccessMode::ReadWrite
        } else {
            mode
        };
        let root = open_database(db_path.as_path(), mode)?;
        tracing::debug!(path = %db_path.display(), ?mode, "opened duckdb database");

        Ok(Self {
            inner: Arc::new(ManagerInner {
                db_path,
                mode,
                root: Mutex::new(root),
            }),
        })
    }

    /// Acquire a connection that is closed when the returned guard drops.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be cloned from the database
    /// instance or configured.
    pub fn acquire(&self) -> Result<ScopedConnection, ::duckdb::Error> {
        let root = self
            .inner
            .root
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let connection = root.try_clone()?;
        drop(root);

        configure_connection(&connection)?;
        tracing::trace!(path = %self.inner.db_path.display(), "connection acquired");
        Ok(ScopedConnection { connection })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }

    /// Access mode the database was opened with.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.inner.mode
    }
}

/// A connection that lives for one store call.
pub struct ScopedConnection {
    connection: Connection,
}

impl Deref for ScopedConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        tracing::trace!("connection released");
    }
}

fn is_in_memory(path: &Path) -> bool {
    path.as_os_str() == IN_MEMORY_PATH
}

/// Open the database instance with the requested access mode.
fn open_database(path: &Path, mode: AccessMode) -> Result<Connection, ::duckdb::Error> {
    let access_mode = match mode {
        AccessMode::ReadOnly => ::duckdb::AccessMode::ReadOnly,
        AccessMode::ReadWrite => ::duckdb::AccessMode::ReadWrite,
    };
    let config = Config::default().access_mode(access_mode)?;

    let connection = if is_in_memory(path) {
        Connection::open_in_memory_with_flags(config)?
    } else {
        Connection::open_with_flags(path, config)?
    };
    configure_connection(&connection)?;
    Ok(connection)
}

/// Per-connection settings.
fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scoped_connections_share_one_in_memory_instance() {
        let manager =
            DuckDbConnectionManager::open(IN_MEMORY_PATH, AccessMode::ReadWrite).expect("open");

        {
            let writer = manager.acquire().expect("writer");
            writer
                .execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1), (2);")
                .expect("write");
        }

        let reader = manager.acquire().expect("reader");
        let count: i64 = reader
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 2);
    }

    #[test]
    fn in_memory_ignores_read_only_request() {
        let manager =
            DuckDbConnectionManager::open(IN_MEMORY_PATH, AccessMode::ReadOnly).expect("open");
        assert_eq!(manager.mode(), AccessMode::ReadWrite);
    }

    #[test]
    fn read_only_file_rejects_writes() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("ro.duckdb");
        {
            let manager = DuckDbConnectionManager::open(&path, AccessMode::ReadWrite).expect("rw");
            let connection = manager.acquire().expect("acquire");
            connection
                .execute_batch("CREATE TABLE t (id INTEGER);")
                .expect("create");
        }

        let manager = DuckDbConnectionManager::open(&path, AccessMode::ReadOnly).expect("ro");
        let connection = manager.acquire().expect("acquire");
        assert!(connection.execute_batch("INSERT INTO t VALUES (1);").is_err());
    }
}
