pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the primary key-value store at the given path.
pub fn open_primary(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = open(path.as_ref())?;
    schema::init_primary_schema(&conn).context("failed to initialize primary schema")?;
    migrations::run_migrations(&conn).context("failed to migrate primary store")?;
    tracing::info!(path = %path.as_ref().display(), "primary store initialized");
    Ok(conn)
}

/// Open (or create) the mirror store at the given path.
pub fn open_mirror(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = open(path.as_ref())?;
    schema::init_mirror_schema(&conn).context("failed to initialize mirror schema")?;
    migrations::run_migrations(&conn).context("failed to migrate mirror store")?;
    tracing::info!(path = %path.as_ref().display(), "mirror store initialized");
    Ok(conn)
}

fn open(path: &Path) -> Result<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;

    Ok(conn)
}

/// Open an in-memory primary store for testing.
pub fn open_memory_primary() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    schema::init_primary_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory mirror store for testing.
pub fn open_memory_mirror() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    schema::init_mirror_schema(&conn)?;
    Ok(conn)
}
