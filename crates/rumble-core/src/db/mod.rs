//! SQLite history store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so a dump can read while an import writes
//! - `busy_timeout = 5s` to ride out transient lock failures
//! - `foreign_keys = ON` to protect relational integrity between entities

pub mod dump;
pub mod migrations;
pub mod schema;
pub mod store;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::{path::Path, time::Duration};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(conn)
}

/// Open an existing store for reading only. Nothing is created or migrated;
/// the schema must already be at [`migrations::LATEST_SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns an error if the database cannot be opened or its schema version
/// differs from the latest one.
pub fn open_store_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("open store database {} read-only", path.display()))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
        .context("configure sqlite busy timeout")?;

    let version = migrations::current_schema_version(&conn).context("read store schema version")?;
    if version != migrations::LATEST_SCHEMA_VERSION {
        anyhow::bail!(
            "store {} is at schema version {version}, expected {}; run `rumble reset` to migrate it",
            path.display(),
            migrations::LATEST_SCHEMA_VERSION
        );
    }
    Ok(conn)
}

/// Remove a store database together with its WAL/SHM side files.
///
/// # Errors
///
/// Returns an error if the main database file exists but cannot be removed.
pub fn remove_store(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("remove existing store {}", path.display()))?;
    }
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_os_string();
        side.push(suffix);
        let _ = std::fs::remove_file(side);
    }
    Ok(())
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}
