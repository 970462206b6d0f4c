//! Mirror store access.
//!
//! The mirror holds a denormalized, query-optimized projection of profiles and
//! notes. It is written by the ingestion path and read by search; the primary
//! store stays the source of truth for existence. There is no transaction
//! spanning the two stores; a crash between writes leaves them inconsistent
//! until the next overwrite or delete of the same note.

use rusqlite::{params, Connection};

use crate::error::ServiceError;
use crate::notes::types::MemoryRow;
use crate::notes::{bytes_to_embedding, embedding_to_bytes};

/// Upsert a profile projection row.
pub fn upsert_profile(
    conn: &Connection,
    profile_id: &str,
    user_id: &str,
    name: &str,
    created_at: &str,
) -> Result<(), ServiceError> {
    conn.execute(
        "INSERT INTO profiles (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![profile_id, user_id, name, created_at],
    )?;
    Ok(())
}

/// Upsert a memory row.
///
/// Uses `ON CONFLICT ... DO UPDATE` rather than `INSERT OR REPLACE` so an
/// overwritten note keeps its rowid, and with it its position in the
/// insertion-ordered candidate listing.
pub fn upsert_memory(conn: &Connection, row: &MemoryRow) -> Result<(), ServiceError> {
    let embedding = embedding_to_bytes(&row.embedding);
    conn.execute(
        "INSERT INTO memories (id, user_id, profile_id, profile_name, entry, embedding, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
         ON CONFLICT(id) DO UPDATE SET \
             profile_name = excluded.profile_name, \
             entry = excluded.entry, \
             embedding = excluded.embedding, \
             updated_at = excluded.updated_at",
        params![
            row.id,
            row.user_id,
            row.profile_id,
            row.profile_name,
            row.entry,
            embedding,
            row.created_at,
            row.updated_at,
        ],
    )?;
    Ok(())
}

/// Delete one memory row by note id.
pub fn delete_memory(conn: &Connection, note_id: &str) -> Result<(), ServiceError> {
    conn.execute("DELETE FROM memories WHERE id = ?1", params![note_id])?;
    Ok(())
}

/// Delete a profile's projection row and all its memory rows.
pub fn delete_profile(conn: &Connection, profile_id: &str) -> Result<(), ServiceError> {
    conn.execute(
        "DELETE FROM memories WHERE profile_id = ?1",
        params![profile_id],
    )?;
    conn.execute("DELETE FROM profiles WHERE id = ?1", params![profile_id])?;
    Ok(())
}

/// All memory rows owned by a user, in insertion order.
pub fn candidates_for_user(conn: &Connection, user_id: &str) -> Result<Vec<MemoryRow>, ServiceError> {
    fetch_candidates(
        conn,
        "SELECT id, user_id, profile_id, profile_name, entry, embedding, created_at, updated_at \
         FROM memories WHERE user_id = ?1 ORDER BY rowid",
        params![user_id],
    )
}

/// A profile's memory rows, in insertion order.
pub fn candidates_for_profile(
    conn: &Connection,
    user_id: &str,
    profile_id: &str,
) -> Result<Vec<MemoryRow>, ServiceError> {
    fetch_candidates(
        conn,
        "SELECT id, user_id, profile_id, profile_name, entry, embedding, created_at, updated_at \
         FROM memories WHERE user_id = ?1 AND profile_id = ?2 ORDER BY rowid",
        params![user_id, profile_id],
    )
}

fn fetch_candidates(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<MemoryRow>, ServiceError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            let blob: Vec<u8> = row.get(5)?;
            Ok(MemoryRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                profile_id: row.get(2)?,
                profile_name: row.get(3)?,
                entry: row.get(4)?,
                embedding: bytes_to_embedding(&blob),
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
