//! SQL DDL for both stores.
//!
//! The primary store is a single namespaced `kv` table (the system of record);
//! the mirror store holds the denormalized `profiles` and `memories` tables used
//! by the retrieval path. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization, and each store carries its own `schema_meta` table.

use rusqlite::Connection;

/// Primary store: one JSON record per namespaced key.
///
/// Keys follow `user:{userId}:profile:{profileId}[:category:{cid} | :note:{nid}]`,
/// so a single prefix scan over `user:{userId}:profile:` returns a user's
/// profiles, categories, and notes intermixed.
const PRIMARY_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Mirror store: query-optimized projection of profiles and notes.
///
/// `memories.id` equals the note id in the primary store. `profile_name` is
/// captured at write time and goes stale if the profile is later renamed.
/// `embedding` is raw little-endian f32 bytes.
const MIRROR_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_profiles_user ON profiles(user_id);

CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    profile_id TEXT NOT NULL,
    profile_name TEXT NOT NULL,
    entry TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id);
CREATE INDEX IF NOT EXISTS idx_memories_profile ON memories(profile_id);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize the primary store schema. Idempotent (uses IF NOT EXISTS).
pub fn init_primary_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(PRIMARY_SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;
    Ok(())
}

/// Initialize the mirror store schema. Idempotent (uses IF NOT EXISTS).
pub fn init_mirror_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(MIRROR_SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;
    Ok(())
}
