//! Forward-only schema migration framework.
//!
//! Both stores track their schema version in a `schema_meta` table. Migrations
//! run sequentially at open to bring a database up to the version the binary
//! expects. Version 1 is the initial schema for both stores.

use rusqlite::Connection;

/// The schema version that the current binary expects, for either store.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Get the current schema version from a store.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Run any pending migrations. No-op when the store is already current.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;

    while version < CURRENT_SCHEMA_VERSION {
        // Future migrations dispatch on `version` here.
        version += 1;
        update_schema_version(conn, version)?;
        tracing::info!(version, "applied schema migration");
    }

    Ok(())
}
